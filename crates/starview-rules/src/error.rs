use starview_types::{BadgeCategory, BadgeSlug, CriteriaType};

/// Describes a specific catalog invariant violation.
///
/// C-1..C-3 are identity and shape checks, C-4..C-8 protect the ascending
/// tier sweep, which stops at the first failing tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogViolation {
    /// C-1: Slugs are unique across the catalog.
    DuplicateSlug { slug: BadgeSlug },
    /// C-2: Tier must be within `MIN_TIER..=MAX_TIER`.
    TierOutOfRange { slug: BadgeSlug, tier: u8 },
    /// C-3: A threshold of zero would be satisfied by every user.
    ZeroThreshold { slug: BadgeSlug },
    /// C-4: Two badges in the same `(category, criteria)` group share a tier.
    DuplicateTier {
        category: BadgeCategory,
        criteria: CriteriaType,
        tier: u8,
        first: BadgeSlug,
        second: BadgeSlug,
    },
    /// C-5: Within a group, thresholds strictly increase with tier.
    ThresholdsNotIncreasing {
        category: BadgeCategory,
        criteria: CriteriaType,
        lower_tier: BadgeSlug,
        higher_tier: BadgeSlug,
        lower_value: u64,
        higher_value: u64,
    },
    /// C-6: Two-part criteria require a secondary percentage; others forbid one.
    SecondaryMismatch {
        slug: BadgeSlug,
        criteria: CriteriaType,
        secondary: Option<u32>,
    },
    /// C-7: Secondary percentages lie within `0..=100`.
    SecondaryOutOfRange { slug: BadgeSlug, percent: u32 },
    /// C-8: Within a group, secondary percentages never decrease with tier.
    SecondaryDecreasing {
        category: BadgeCategory,
        criteria: CriteriaType,
        lower_tier: BadgeSlug,
        higher_tier: BadgeSlug,
    },
}

/// Errors produced by catalog construction and lookup.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown badge '{0}'")]
    UnknownBadge(String),
    #[error("malformed catalog: {}", render_violations(.0))]
    Malformed(Vec<CatalogViolation>),
    /// A stored definition that cannot be read as a badge at all.
    #[error("invalid badge definition '{slug}': {reason}")]
    InvalidDefinition { slug: String, reason: String },
}

fn render_violations(violations: &[CatalogViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl std::fmt::Display for CatalogViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateSlug { slug } => write!(f, "C-1: slug '{slug}' defined more than once"),
            Self::TierOutOfRange { slug, tier } => {
                write!(f, "C-2: '{slug}' has tier {tier} outside 1..=5")
            }
            Self::ZeroThreshold { slug } => write!(f, "C-3: '{slug}' has a zero threshold"),
            Self::DuplicateTier {
                category,
                criteria,
                tier,
                first,
                second,
            } => write!(
                f,
                "C-4: '{first}' and '{second}' share tier {tier} in {category}/{criteria}"
            ),
            Self::ThresholdsNotIncreasing {
                category,
                criteria,
                lower_tier,
                higher_tier,
                lower_value,
                higher_value,
            } => write!(
                f,
                "C-5: {category}/{criteria} threshold of '{higher_tier}' ({higher_value}) is not above '{lower_tier}' ({lower_value})"
            ),
            Self::SecondaryMismatch {
                slug,
                criteria,
                secondary,
            } => match secondary {
                Some(percent) => write!(
                    f,
                    "C-6: '{slug}' sets secondary {percent} but {criteria} is single-part"
                ),
                None => write!(f, "C-6: '{slug}' needs a secondary percentage for {criteria}"),
            },
            Self::SecondaryOutOfRange { slug, percent } => {
                write!(f, "C-7: '{slug}' secondary {percent} is outside 0..=100")
            }
            Self::SecondaryDecreasing {
                category,
                criteria,
                lower_tier,
                higher_tier,
            } => write!(
                f,
                "C-8: {category}/{criteria} secondary of '{higher_tier}' is below '{lower_tier}'"
            ),
        }
    }
}
