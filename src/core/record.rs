use serde::{Deserialize, Serialize};

use crate::core::ResultSet;

/// One entry of the persisted scan history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub url: String,
    pub timestamp: String,
    pub results: ResultSet,
}

impl ScanRecord {
    pub fn new(url: impl Into<String>, results: ResultSet) -> Self {
        Self {
            url: url.into(),
            timestamp: crate::core::timestamp_now(),
            results,
        }
    }
}
