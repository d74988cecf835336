use std::collections::{BTreeMap, BTreeSet, HashMap};

use starview_types::{BadgeCategory, BadgeDefinition, BadgeSlug, CriteriaType};

use crate::error::CatalogError;
use crate::invariants::validate_catalog;

type GroupKey = (BadgeCategory, CriteriaType);

/// Validated, indexed badge catalog.
///
/// Definitions are grouped by `(category, criteria)` and each group is held
/// in ascending threshold order, which the tier sweep relies on. Immutable
/// once built; a catalog edit produces a new instance.
#[derive(Clone, Debug, Default)]
pub struct BadgeCatalog {
    groups: BTreeMap<GroupKey, Vec<BadgeDefinition>>,
    by_slug: HashMap<BadgeSlug, (GroupKey, usize)>,
}

impl BadgeCatalog {
    /// Validate and index a set of definitions.
    ///
    /// Any invariant violation rejects the whole catalog with
    /// [`CatalogError::Malformed`]; a malformed row is never silently skipped.
    pub fn build(definitions: Vec<BadgeDefinition>) -> Result<Self, CatalogError> {
        let violations = validate_catalog(&definitions);
        if !violations.is_empty() {
            return Err(CatalogError::Malformed(violations));
        }

        let mut groups: BTreeMap<GroupKey, Vec<BadgeDefinition>> = BTreeMap::new();
        for def in definitions {
            groups
                .entry((def.category, def.criteria_type))
                .or_default()
                .push(def);
        }

        let mut by_slug = HashMap::new();
        for (key, group) in groups.iter_mut() {
            group.sort_by_key(|d| d.criteria_value);
            for (idx, def) in group.iter().enumerate() {
                by_slug.insert(def.slug.clone(), (*key, idx));
            }
        }

        Ok(Self { groups, by_slug })
    }

    /// Badges of one `(category, criteria)` pair, ascending by threshold.
    ///
    /// Empty when the catalog has no such group.
    pub fn list_by_category(&self, category: BadgeCategory, criteria: CriteriaType) -> &[BadgeDefinition] {
        self.groups
            .get(&(category, criteria))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get_by_slug(&self, slug: &str) -> Result<&BadgeDefinition, CatalogError> {
        self.by_slug
            .get(slug)
            .and_then(|(key, idx)| self.groups.get(key).and_then(|g| g.get(*idx)))
            .ok_or_else(|| CatalogError::UnknownBadge(slug.to_string()))
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.by_slug.contains_key(slug)
    }

    /// All groups in `(category, criteria)` order.
    pub fn groups(&self) -> impl Iterator<Item = (BadgeCategory, CriteriaType, &[BadgeDefinition])> {
        self.groups
            .iter()
            .map(|((category, criteria), group)| (*category, *criteria, group.as_slice()))
    }

    /// All definitions: by category, then criteria, then ascending threshold.
    pub fn iter(&self) -> impl Iterator<Item = &BadgeDefinition> {
        self.groups.values().flatten()
    }

    /// Criteria types referenced by at least one badge. One aggregate read
    /// per entry is enough to compute a full progress snapshot.
    pub fn criteria_in_use(&self) -> BTreeSet<CriteriaType> {
        self.groups.keys().map(|(_, criteria)| *criteria).collect()
    }

    pub fn len(&self) -> usize {
        self.by_slug.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::seed::default_catalog;

    #[test]
    fn groups_are_sorted_ascending_regardless_of_input_order() {
        let mut defs = default_catalog();
        defs.reverse();
        let catalog = BadgeCatalog::build(defs).unwrap();

        let values: Vec<u64> = catalog
            .list_by_category(BadgeCategory::Exploration, CriteriaType::LocationVisits)
            .iter()
            .map(|d| d.criteria_value)
            .collect();
        assert_eq!(values, vec![1, 5, 10, 25, 50]);
    }

    #[test]
    fn lookup_by_slug() {
        let catalog = BadgeCatalog::build(default_catalog()).unwrap();
        assert_eq!(catalog.get_by_slug("explorer").unwrap().criteria_value, 5);
        assert_eq!(
            catalog.get_by_slug("no-such-badge").unwrap_err(),
            CatalogError::UnknownBadge("no-such-badge".to_string())
        );
    }

    #[test]
    fn unknown_group_is_empty() {
        let catalog = BadgeCatalog::build(default_catalog()).unwrap();
        assert!(catalog
            .list_by_category(BadgeCategory::Tenure, CriteriaType::LocationVisits)
            .is_empty());
    }

    #[test]
    fn malformed_catalog_is_rejected_whole() {
        let mut defs = default_catalog();
        defs[1].criteria_value = defs[0].criteria_value;
        let err = BadgeCatalog::build(defs).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed(ref v) if v.len() == 1));
    }

    #[test]
    fn iteration_order_follows_category_then_threshold() {
        let catalog = BadgeCatalog::build(default_catalog()).unwrap();
        let exploration: Vec<&str> = catalog
            .iter()
            .filter(|d| d.category == BadgeCategory::Exploration)
            .map(|d| d.slug.as_str())
            .collect();
        assert_snapshot!(
            exploration.join(","),
            @"first-light,explorer,pathfinder,sky-seeker,stargazer"
        );
        assert_eq!(catalog.len(), default_catalog().len());
    }
}
