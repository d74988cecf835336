pub mod achievement;
pub mod activity;
pub mod aggregate;
pub mod anomaly;
pub mod badge;
pub mod error;
pub mod ids;
pub mod progress;

pub use achievement::AchievementRecord;
pub use activity::{ActivityEvent, FactOutcome, FactType};
pub use aggregate::{Aggregate, HelpfulRatio};
pub use anomaly::AnomalyFlag;
pub use badge::{BadgeCategory, BadgeDefinition, Comparison, CriteriaType, MAX_TIER, MIN_TIER};
pub use error::DomainError;
pub use ids::{BadgeSlug, EntityId, EventId, MAX_SLUG_LEN, UserId};
pub use progress::{EarnedBadge, InProgressBadge, LockedBadge, ProgressSnapshot};
