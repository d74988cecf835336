use crate::ids::{EntityId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of activity row whose creation or removal is reported to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactType {
    /// A location marked as visited. `related` is the location.
    Visit,
    /// A location added to the map. `related` is the location.
    LocationAuthored,
    /// A review of a location. `related` is the location, owner is its author.
    Review,
    /// A vote on a review. `related` is the review, owner is its author.
    Vote,
    /// A follow edge. `related` and owner are the followed user.
    Follow,
    /// A comment on a review. `related` is the review, owner is its author.
    Comment,
    /// An uploaded photo. `related` is the photo.
    Photo,
    /// Profile fields edited.
    Profile,
    /// Account created.
    Registration,
}

impl FactType {
    pub const ALL: [FactType; 9] = [
        Self::Visit,
        Self::LocationAuthored,
        Self::Review,
        Self::Vote,
        Self::Follow,
        Self::Comment,
        Self::Photo,
        Self::Profile,
        Self::Registration,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Visit => "Visit",
            Self::LocationAuthored => "LocationAuthored",
            Self::Review => "Review",
            Self::Vote => "Vote",
            Self::Follow => "Follow",
            Self::Comment => "Comment",
            Self::Photo => "Photo",
            Self::Profile => "Profile",
            Self::Registration => "Registration",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactOutcome {
    Created,
    /// The row still exists but a counted attribute moved (vote flipped, profile edited).
    Changed,
    Removed,
}

impl FactOutcome {
    pub const ALL: [FactOutcome; 3] = [Self::Created, Self::Changed, Self::Removed];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Changed => "Changed",
            Self::Removed => "Removed",
        }
    }
}

/// "User performed action X with outcome Y", fired after the fact row is persisted.
///
/// `related_owner` is captured by the caller at persistence time because the
/// owning row may already be gone when a removal is reported.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub fact: FactType,
    pub outcome: FactOutcome,
    pub user: UserId,
    pub related: EntityId,
    pub related_owner: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(
        fact: FactType,
        outcome: FactOutcome,
        user: UserId,
        related: EntityId,
        related_owner: Option<UserId>,
    ) -> Self {
        Self {
            fact,
            outcome,
            user,
            related,
            related_owner,
            occurred_at: Utc::now(),
        }
    }

    /// Override the occurrence time (backfills, tests).
    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    pub fn visit_recorded(user: UserId, location: EntityId) -> Self {
        Self::new(FactType::Visit, FactOutcome::Created, user, location, None)
    }

    pub fn visit_removed(user: UserId, location: EntityId) -> Self {
        Self::new(FactType::Visit, FactOutcome::Removed, user, location, None)
    }

    pub fn location_authored(user: UserId, location: EntityId) -> Self {
        Self::new(
            FactType::LocationAuthored,
            FactOutcome::Created,
            user,
            location,
            Some(user),
        )
    }

    pub fn location_removed(user: UserId, location: EntityId) -> Self {
        Self::new(
            FactType::LocationAuthored,
            FactOutcome::Removed,
            user,
            location,
            Some(user),
        )
    }

    pub fn review_authored(user: UserId, location: EntityId, location_author: UserId) -> Self {
        Self::new(
            FactType::Review,
            FactOutcome::Created,
            user,
            location,
            Some(location_author),
        )
    }

    pub fn review_removed(user: UserId, location: EntityId, location_author: UserId) -> Self {
        Self::new(
            FactType::Review,
            FactOutcome::Removed,
            user,
            location,
            Some(location_author),
        )
    }

    pub fn vote_cast(voter: UserId, review: EntityId, review_author: UserId) -> Self {
        Self::new(
            FactType::Vote,
            FactOutcome::Created,
            voter,
            review,
            Some(review_author),
        )
    }

    pub fn vote_changed(voter: UserId, review: EntityId, review_author: UserId) -> Self {
        Self::new(
            FactType::Vote,
            FactOutcome::Changed,
            voter,
            review,
            Some(review_author),
        )
    }

    pub fn vote_removed(voter: UserId, review: EntityId, review_author: UserId) -> Self {
        Self::new(
            FactType::Vote,
            FactOutcome::Removed,
            voter,
            review,
            Some(review_author),
        )
    }

    pub fn follow_created(follower: UserId, followed: UserId) -> Self {
        Self::new(
            FactType::Follow,
            FactOutcome::Created,
            follower,
            followed.0,
            Some(followed),
        )
    }

    pub fn follow_removed(follower: UserId, followed: UserId) -> Self {
        Self::new(
            FactType::Follow,
            FactOutcome::Removed,
            follower,
            followed.0,
            Some(followed),
        )
    }

    pub fn comment_authored(user: UserId, review: EntityId, review_author: UserId) -> Self {
        Self::new(
            FactType::Comment,
            FactOutcome::Created,
            user,
            review,
            Some(review_author),
        )
    }

    pub fn comment_removed(user: UserId, review: EntityId, review_author: UserId) -> Self {
        Self::new(
            FactType::Comment,
            FactOutcome::Removed,
            user,
            review,
            Some(review_author),
        )
    }

    pub fn photo_uploaded(user: UserId, photo: EntityId) -> Self {
        Self::new(FactType::Photo, FactOutcome::Created, user, photo, None)
    }

    pub fn photo_removed(user: UserId, photo: EntityId) -> Self {
        Self::new(FactType::Photo, FactOutcome::Removed, user, photo, None)
    }

    pub fn profile_updated(user: UserId) -> Self {
        Self::new(FactType::Profile, FactOutcome::Changed, user, user.0, Some(user))
    }

    pub fn registered(user: UserId) -> Self {
        Self::new(
            FactType::Registration,
            FactOutcome::Created,
            user,
            user.0,
            Some(user),
        )
    }

    /// True when the actor acted on their own content.
    pub fn is_self_directed(&self) -> bool {
        self.related_owner == Some(self.user)
    }
}
