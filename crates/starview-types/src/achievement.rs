use crate::ids::{BadgeSlug, EventId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A badge currently held by a user. The only row the engine creates or destroys.
///
/// `(user, badge)` is unique. `earned_at` is set once and never rewritten while
/// the record exists; `event` is the activity event whose evaluation awarded it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementRecord {
    pub user: UserId,
    pub badge: BadgeSlug,
    pub earned_at: DateTime<Utc>,
    pub event: EventId,
}
