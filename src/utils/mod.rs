pub mod logging;

use chrono::Utc;

/// Wall-clock time in fractional epoch seconds, the unit the collector expects.
pub fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
