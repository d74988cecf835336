use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::ids::BadgeSlug;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_TIER: u8 = 1;
pub const MAX_TIER: u8 = 5;

/// Display grouping of badges. Also decides revocability: tenure badges
/// record a historical fact and are never taken away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeCategory {
    Exploration,
    Contribution,
    Quality,
    Review,
    Community,
    Special,
    Tenure,
}

impl BadgeCategory {
    pub const ALL: [BadgeCategory; 7] = [
        Self::Exploration,
        Self::Contribution,
        Self::Quality,
        Self::Review,
        Self::Community,
        Self::Special,
        Self::Tenure,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Exploration => "EXPLORATION",
            Self::Contribution => "CONTRIBUTION",
            Self::Quality => "QUALITY",
            Self::Review => "REVIEW",
            Self::Community => "COMMUNITY",
            Self::Special => "SPECIAL",
            Self::Tenure => "TENURE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn allows_revocation(&self) -> bool {
        !matches!(self, Self::Tenure)
    }
}

impl fmt::Display for BadgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an aggregate is compared against a badge threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    /// `aggregate >= threshold`. Tiers are swept in ascending order.
    AtLeast,
    /// `1 <= aggregate <= threshold` (rank style, 0 means unranked).
    /// Tiers are swept in descending order.
    AtMost,
}

/// The aggregate a badge threshold is measured against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriteriaType {
    /// Distinct locations marked as visited.
    LocationVisits,
    /// Locations the user authored.
    LocationsAdded,
    /// Authored locations whose average rating from other users is at least 4.0.
    WellRatedLocations,
    /// Reviews written.
    ReviewsWritten,
    /// Upvotes received on the user's reviews from other users.
    UpvotesReceived,
    /// Review count plus helpful percentage (two-part).
    HelpfulRatio,
    /// Comments written on other users' reviews.
    CommentsWritten,
    /// Followers of the user.
    FollowerCount,
    /// Photos uploaded.
    PhotosUploaded,
    /// 1-based registration order.
    TenureRank,
    /// Profile completeness in percent.
    ProfileCompleteness,
}

impl CriteriaType {
    pub const ALL: [CriteriaType; 11] = [
        Self::LocationVisits,
        Self::LocationsAdded,
        Self::WellRatedLocations,
        Self::ReviewsWritten,
        Self::UpvotesReceived,
        Self::HelpfulRatio,
        Self::CommentsWritten,
        Self::FollowerCount,
        Self::PhotosUploaded,
        Self::TenureRank,
        Self::ProfileCompleteness,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LocationVisits => "LOCATION_VISITS",
            Self::LocationsAdded => "LOCATIONS_ADDED",
            Self::WellRatedLocations => "WELL_RATED_LOCATIONS",
            Self::ReviewsWritten => "REVIEWS_WRITTEN",
            Self::UpvotesReceived => "UPVOTES_RECEIVED",
            Self::HelpfulRatio => "HELPFUL_RATIO",
            Self::CommentsWritten => "COMMENTS_WRITTEN",
            Self::FollowerCount => "FOLLOWER_COUNT",
            Self::PhotosUploaded => "PHOTOS_UPLOADED",
            Self::TenureRank => "TENURE_RANK",
            Self::ProfileCompleteness => "PROFILE_COMPLETENESS",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn comparison(&self) -> Comparison {
        match self {
            Self::TenureRank => Comparison::AtMost,
            _ => Comparison::AtLeast,
        }
    }

    /// Two-part criteria carry a percentage in `criteria_secondary`.
    pub fn requires_secondary(&self) -> bool {
        matches!(self, Self::HelpfulRatio)
    }
}

impl fmt::Display for CriteriaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A catalog row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub slug: BadgeSlug,
    pub name: String,
    pub description: String,
    pub category: BadgeCategory,
    pub criteria_type: CriteriaType,
    pub criteria_value: u64,
    pub criteria_secondary: Option<u32>,
    pub tier: u8,
    /// Administrative opt-out. Tenure badges ignore this and are never revoked.
    pub revocable: bool,
}

impl BadgeDefinition {
    pub fn new(
        slug: BadgeSlug,
        name: impl Into<String>,
        category: BadgeCategory,
        criteria_type: CriteriaType,
        criteria_value: u64,
        tier: u8,
    ) -> Result<Self, DomainError> {
        if !(MIN_TIER..=MAX_TIER).contains(&tier) {
            return Err(DomainError::TierOutOfRange {
                tier,
                min: MIN_TIER,
                max: MAX_TIER,
            });
        }
        Ok(Self {
            slug,
            name: name.into(),
            description: String::new(),
            category,
            criteria_type,
            criteria_value,
            criteria_secondary: None,
            tier,
            revocable: true,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_secondary(mut self, percent: u32) -> Self {
        self.criteria_secondary = Some(percent);
        self
    }

    pub fn non_revocable(mut self) -> Self {
        self.revocable = false;
        self
    }

    /// Whether a held record may be removed when the aggregate falls back.
    pub fn is_revocable(&self) -> bool {
        self.revocable
            && self.category.allows_revocation()
            && self.criteria_type != CriteriaType::TenureRank
    }

    /// Combined primary and secondary predicate for this tier.
    pub fn is_satisfied_by(&self, aggregate: &Aggregate) -> bool {
        let primary = match self.criteria_type.comparison() {
            Comparison::AtLeast => aggregate.value >= self.criteria_value,
            Comparison::AtMost => aggregate.value > 0 && aggregate.value <= self.criteria_value,
        };
        let secondary = match self.criteria_secondary {
            None => true,
            Some(percent) => aggregate
                .ratio
                .is_some_and(|ratio| ratio.meets_percent(percent)),
        };
        primary && secondary
    }
}
