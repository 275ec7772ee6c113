use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatsRole {
    User,
    Rider,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParcelStats {
    pub total: usize,
    pub delivered: usize,
    pub pending: usize,
    pub earnings: f64,
    #[serde(rename = "cashedOut")]
    pub cashed_out: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}
