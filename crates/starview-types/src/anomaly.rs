use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit-trail entry for a visit burst. Informational only; nothing is blocked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub user: UserId,
    pub visits_in_window: u64,
    pub threshold: u64,
    pub window_secs: u64,
    pub flagged_at: DateTime<Utc>,
}
