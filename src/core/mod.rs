mod finding;
mod record;
mod result_set;

pub use finding::{Finding, Observation, Severity};
pub use record::ScanRecord;
pub use result_set::{ResultSet, score};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub fn timestamp_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}
