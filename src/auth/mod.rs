pub mod extract;
pub mod policy;
pub mod verifier;

use serde::{Deserialize, Serialize};

/// Identity vouched for by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
}
