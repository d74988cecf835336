//! Collaborator seams. The engine owns none of this storage; the host
//! application supplies implementations (or uses [`SqliteStore`](crate::SqliteStore)).

use chrono::{DateTime, Utc};
use starview_types::{
    AchievementRecord, ActivityEvent, Aggregate, AnomalyFlag, BadgeDefinition, BadgeSlug,
    CriteriaType, EntityId, EventId, HelpfulRatio, UserId,
};

use crate::error::StoreError;

/// Read side of the activity tables, one method per aggregate.
///
/// Every count already applies its self-action exclusion: a user's own
/// comments, votes and ratings on their own content never count.
pub trait FactStore: Send + Sync {
    fn location_visits(&self, user: UserId) -> Result<u64, StoreError>;
    fn locations_added(&self, user: UserId) -> Result<u64, StoreError>;
    /// Authored locations whose average rating from other users is at least 4.0.
    fn well_rated_locations(&self, user: UserId) -> Result<u64, StoreError>;
    fn reviews_written(&self, user: UserId) -> Result<u64, StoreError>;
    fn upvotes_received(&self, user: UserId) -> Result<u64, StoreError>;
    /// Up and total votes cast by others on the user's reviews.
    fn helpful_votes(&self, user: UserId) -> Result<HelpfulRatio, StoreError>;
    fn comments_written(&self, user: UserId) -> Result<u64, StoreError>;
    fn follower_count(&self, user: UserId) -> Result<u64, StoreError>;
    fn photos_uploaded(&self, user: UserId) -> Result<u64, StoreError>;
    /// 1-based registration order, 0 for an unknown user.
    fn tenure_rank(&self, user: UserId) -> Result<u64, StoreError>;
    fn profile_completeness(&self, user: UserId) -> Result<u64, StoreError>;

    /// Visits recorded at or after `since`.
    fn visits_since(&self, user: UserId, since: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Record a visit unless one exists. Returns whether a row was inserted.
    fn mark_visited(&self, user: UserId, location: EntityId, at: DateTime<Utc>) -> Result<bool, StoreError>;
}

/// Compute the aggregate one criteria type is measured against.
pub fn aggregate_for(
    criteria: CriteriaType,
    facts: &dyn FactStore,
    user: UserId,
) -> Result<Aggregate, StoreError> {
    let aggregate = match criteria {
        CriteriaType::LocationVisits => Aggregate::count(facts.location_visits(user)?),
        CriteriaType::LocationsAdded => Aggregate::count(facts.locations_added(user)?),
        CriteriaType::WellRatedLocations => Aggregate::count(facts.well_rated_locations(user)?),
        CriteriaType::ReviewsWritten => Aggregate::count(facts.reviews_written(user)?),
        CriteriaType::UpvotesReceived => Aggregate::count(facts.upvotes_received(user)?),
        CriteriaType::HelpfulRatio => {
            Aggregate::with_ratio(facts.reviews_written(user)?, facts.helpful_votes(user)?)
        }
        CriteriaType::CommentsWritten => Aggregate::count(facts.comments_written(user)?),
        CriteriaType::FollowerCount => Aggregate::count(facts.follower_count(user)?),
        CriteriaType::PhotosUploaded => Aggregate::count(facts.photos_uploaded(user)?),
        CriteriaType::TenureRank => Aggregate::count(facts.tenure_rank(user)?),
        CriteriaType::ProfileCompleteness => Aggregate::count(facts.profile_completeness(user)?),
    };
    Ok(aggregate)
}

/// Rows actually changed by [`Ledger::apply`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppliedChange {
    pub awarded: Vec<BadgeSlug>,
    pub revoked: Vec<BadgeSlug>,
}

impl AppliedChange {
    pub fn is_empty(&self) -> bool {
        self.awarded.is_empty() && self.revoked.is_empty()
    }
}

/// The achievement ledger: the only state the engine owns.
pub trait Ledger: Send + Sync {
    /// Persist the event and return its sequence number.
    fn allocate_event(&self, event: &ActivityEvent) -> Result<EventId, StoreError>;

    /// Sequence number for a ledger change not caused by user activity
    /// (manual evaluation, reconciliation). `reason` is kept in the log.
    fn allocate_maintenance_event(&self, user: UserId, reason: &str) -> Result<EventId, StoreError>;

    fn held(&self, user: UserId) -> Result<Vec<AchievementRecord>, StoreError>;

    /// Insert `award` and delete `revoke` for one user in a single transaction.
    ///
    /// Inserting a held badge is a no-op, as is deleting one not held. Only
    /// rows this call actually changed are reported, so when two writers race
    /// on the same award exactly one of them sees it in `awarded`.
    fn apply(
        &self,
        user: UserId,
        award: &[BadgeSlug],
        revoke: &[BadgeSlug],
        event: EventId,
        at: DateTime<Utc>,
    ) -> Result<AppliedChange, StoreError>;

    /// Records awarded by event `since` or later.
    fn awarded_since(&self, user: UserId, since: EventId) -> Result<Vec<AchievementRecord>, StoreError>;

    fn users_with_records(&self) -> Result<Vec<UserId>, StoreError>;
}

/// Storage for the pinned set, which lives on the user profile.
pub trait PinStore: Send + Sync {
    fn pinned(&self, user: UserId) -> Result<Vec<BadgeSlug>, StoreError>;
    /// Replace the pinned set in one step with the holding check, so a
    /// concurrent revocation cannot leave an unheld badge pinned. Returns the
    /// first badge the user does not hold, in which case nothing is written.
    fn replace_pinned(&self, user: UserId, badges: &[BadgeSlug]) -> Result<Option<BadgeSlug>, StoreError>;
}

pub trait AuditTrail: Send + Sync {
    fn flag(&self, flag: &AnomalyFlag) -> Result<(), StoreError>;
}

pub trait CatalogSource: Send + Sync {
    fn load_definitions(&self) -> Result<Vec<BadgeDefinition>, StoreError>;
}
