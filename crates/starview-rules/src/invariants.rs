//! Catalog invariant checking.
//!
//! Validation is batch only: the catalog is loaded whole, so every violation
//! is collected in one pass and reported together. A catalog with any
//! violation is refused by [`BadgeCatalog::build`](crate::BadgeCatalog::build).
//!
//! Checks fall into two groups:
//! - per-definition (C-1, C-2, C-3, C-6, C-7): identity and shape of each row.
//! - per-group (C-4, C-5, C-8): ordering within one `(category, criteria)` pair.

use std::collections::{BTreeMap, HashSet};

use starview_types::{BadgeCategory, BadgeDefinition, CriteriaType, MAX_TIER, MIN_TIER};

use crate::error::CatalogViolation;

/// Validate a full set of definitions, returning all detected violations.
pub fn validate_catalog(definitions: &[BadgeDefinition]) -> Vec<CatalogViolation> {
    let mut violations = Vec::new();
    let mut seen = HashSet::new();

    for def in definitions {
        if !seen.insert(def.slug.clone()) {
            violations.push(CatalogViolation::DuplicateSlug {
                slug: def.slug.clone(),
            });
        }
        check_definition(def, &mut violations);
    }

    for ((category, criteria), group) in group_by_tier(definitions) {
        check_group(category, criteria, &group, &mut violations);
    }

    violations
}

fn check_definition(def: &BadgeDefinition, violations: &mut Vec<CatalogViolation>) {
    if !(MIN_TIER..=MAX_TIER).contains(&def.tier) {
        violations.push(CatalogViolation::TierOutOfRange {
            slug: def.slug.clone(),
            tier: def.tier,
        });
    }
    if def.criteria_value == 0 {
        violations.push(CatalogViolation::ZeroThreshold {
            slug: def.slug.clone(),
        });
    }
    if def.criteria_type.requires_secondary() != def.criteria_secondary.is_some() {
        violations.push(CatalogViolation::SecondaryMismatch {
            slug: def.slug.clone(),
            criteria: def.criteria_type,
            secondary: def.criteria_secondary,
        });
    }
    if let Some(percent) = def.criteria_secondary {
        if percent > 100 {
            violations.push(CatalogViolation::SecondaryOutOfRange {
                slug: def.slug.clone(),
                percent,
            });
        }
    }
}

/// Consecutive pairs in tier order must have distinct tiers, strictly larger
/// thresholds and non-decreasing secondaries.
fn check_group(
    category: BadgeCategory,
    criteria: CriteriaType,
    group: &[&BadgeDefinition],
    violations: &mut Vec<CatalogViolation>,
) {
    for pair in group.windows(2) {
        let (lower, higher) = (pair[0], pair[1]);
        if lower.tier == higher.tier {
            violations.push(CatalogViolation::DuplicateTier {
                category,
                criteria,
                tier: lower.tier,
                first: lower.slug.clone(),
                second: higher.slug.clone(),
            });
            continue;
        }
        if higher.criteria_value <= lower.criteria_value {
            violations.push(CatalogViolation::ThresholdsNotIncreasing {
                category,
                criteria,
                lower_tier: lower.slug.clone(),
                higher_tier: higher.slug.clone(),
                lower_value: lower.criteria_value,
                higher_value: higher.criteria_value,
            });
        }
        if let (Some(lo), Some(hi)) = (lower.criteria_secondary, higher.criteria_secondary) {
            if hi < lo {
                violations.push(CatalogViolation::SecondaryDecreasing {
                    category,
                    criteria,
                    lower_tier: lower.slug.clone(),
                    higher_tier: higher.slug.clone(),
                });
            }
        }
    }
}

fn group_by_tier(
    definitions: &[BadgeDefinition],
) -> BTreeMap<(BadgeCategory, CriteriaType), Vec<&BadgeDefinition>> {
    let mut groups: BTreeMap<_, Vec<&BadgeDefinition>> = BTreeMap::new();
    for def in definitions {
        groups
            .entry((def.category, def.criteria_type))
            .or_default()
            .push(def);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|d| (d.tier, d.criteria_value));
    }
    groups
}
