use crate::badge::BadgeDefinition;
use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub badge: BadgeDefinition,
    pub earned_at: DateTime<Utc>,
}

/// An unearned badge with recorded activity toward it.
///
/// `percentage` is `floor(current / criteria_value * 100)` clamped to `0..=99`;
/// 100 is reserved for earned badges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InProgressBadge {
    pub badge: BadgeDefinition,
    pub current: u64,
    pub percentage: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedBadge {
    pub badge: BadgeDefinition,
}

/// Earned / in-progress / locked partition of the full catalog for one user.
///
/// Derived on demand and cached; never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub user: UserId,
    pub earned: Vec<EarnedBadge>,
    pub in_progress: Vec<InProgressBadge>,
    pub locked: Vec<LockedBadge>,
}

impl ProgressSnapshot {
    pub fn total(&self) -> usize {
        self.earned.len() + self.in_progress.len() + self.locked.len()
    }

    pub fn is_earned(&self, slug: &str) -> bool {
        self.earned.iter().any(|e| e.badge.slug.as_str() == slug)
    }

    pub fn in_progress_for(&self, slug: &str) -> Option<&InProgressBadge> {
        self.in_progress
            .iter()
            .find(|p| p.badge.slug.as_str() == slug)
    }

    pub fn is_locked(&self, slug: &str) -> bool {
        self.locked.iter().any(|l| l.badge.slug.as_str() == slug)
    }
}
