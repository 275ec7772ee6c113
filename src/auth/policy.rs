//! Pure role policy. No I/O: callers look the user up and pass it in.

use super::Identity;
use crate::models::user::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

/// Role match is exact: an admin does not pass a rider check.
pub fn authorize(identity: &Identity, stored: Option<&User>, required: Role) -> Decision {
    let Some(user) = stored else {
        return Decision::Deny("no user record for caller");
    };

    if !user.email.eq_ignore_ascii_case(&identity.email) {
        return Decision::Deny("user record does not belong to caller");
    }

    if user.role != required {
        return Decision::Deny(match required {
            Role::Admin => "admin role required",
            Role::Rider => "rider role required",
            Role::User => "user role required",
        });
    }

    Decision::Allow
}

/// Whether the caller may read or act on data owned by `owner_email`.
pub fn can_act_for(identity: &Identity, stored: Option<&User>, owner_email: &str) -> bool {
    identity.email.eq_ignore_ascii_case(owner_email)
        || authorize(identity, stored, Role::Admin) == Decision::Allow
}
