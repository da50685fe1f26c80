use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary returned when a session ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub length_secs: f64,
}
