use rusqlite::{Connection, params};
use starview_types::{BadgeCategory, BadgeDefinition, BadgeSlug, CriteriaType};
use tracing::info;

use super::SqliteStore;
use crate::error::StoreError;
use crate::store::CatalogSource;

const TABLE: &str = "badge_definitions";

type DefinitionRow = (String, String, String, String, String, i64, Option<i64>, i64, bool);

impl CatalogSource for SqliteStore {
    /// Rows are converted as stored; range and ordering rules are left to
    /// catalog validation so every problem is reported together.
    fn load_definitions(&self) -> Result<Vec<BadgeDefinition>, StoreError> {
        let conn = self.conn.lock();
        let rows: Vec<DefinitionRow> = conn
            .prepare_cached(
                "SELECT slug, name, description, category, criteria_type,
                        criteria_value, criteria_secondary, tier, revocable
                 FROM badge_definitions ORDER BY slug",
            )?
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(definition_from_row).collect()
    }
}

fn invalid(slug: &str, reason: impl ToString) -> StoreError {
    StoreError::InvalidDefinition {
        slug: slug.to_string(),
        reason: reason.to_string(),
    }
}

fn definition_from_row(row: DefinitionRow) -> Result<BadgeDefinition, StoreError> {
    let (raw_slug, name, description, category, criteria, value, secondary, tier, revocable) = row;
    let slug = BadgeSlug::new(raw_slug.as_str()).map_err(|err| invalid(&raw_slug, err))?;
    let category =
        BadgeCategory::from_name(&category).ok_or_else(|| invalid(&raw_slug, format!("unknown category {category}")))?;
    let criteria_type = CriteriaType::from_name(&criteria)
        .ok_or_else(|| invalid(&raw_slug, format!("unknown criteria type {criteria}")))?;
    let criteria_secondary = secondary
        .map(|percent| u32::try_from(percent).map_err(|_| invalid(&raw_slug, format!("secondary {percent}"))))
        .transpose()?;
    let tier = u8::try_from(tier).map_err(|_| invalid(&raw_slug, format!("tier {tier}")))?;
    let criteria_value = u64::try_from(value).map_err(|_| invalid(&raw_slug, format!("threshold {value}")))?;

    Ok(BadgeDefinition {
        criteria_value,
        slug,
        name,
        description,
        category,
        criteria_type,
        criteria_secondary,
        tier,
        revocable,
    })
}

fn write_definition(conn: &Connection, def: &BadgeDefinition, replace: bool) -> Result<usize, StoreError> {
    let conflict = if replace {
        "ON CONFLICT (slug) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            category = excluded.category,
            criteria_type = excluded.criteria_type,
            criteria_value = excluded.criteria_value,
            criteria_secondary = excluded.criteria_secondary,
            tier = excluded.tier,
            revocable = excluded.revocable"
    } else {
        "ON CONFLICT (slug) DO NOTHING"
    };
    let sql = format!(
        "INSERT INTO badge_definitions
            (slug, name, description, category, criteria_type, criteria_value, criteria_secondary, tier, revocable)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) {conflict}"
    );
    let changed = conn.execute(
        &sql,
        params![
            def.slug.as_str(),
            def.name,
            def.description,
            def.category.name(),
            def.criteria_type.name(),
            i64::try_from(def.criteria_value).unwrap_or(i64::MAX),
            def.criteria_secondary,
            def.tier,
            def.revocable,
        ],
    )?;
    Ok(changed)
}

impl SqliteStore {
    /// Insert or replace one definition. The engine keeps serving its cached
    /// catalog until [`BadgeEngine::invalidate_catalog`](crate::BadgeEngine::invalidate_catalog).
    pub fn upsert_definition(&self, def: &BadgeDefinition) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        write_definition(&conn, def, true)?;
        info!(badge = %def.slug, "badge definition written");
        Ok(())
    }

    /// Install definitions that are not present yet. Existing rows, possibly
    /// edited by an administrator, are kept. Returns how many were inserted.
    pub fn seed_catalog(&self, definitions: &[BadgeDefinition]) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut inserted = 0;
        for def in definitions {
            inserted += write_definition(&tx, def, false)?;
        }
        tx.commit()?;
        info!(inserted, total = definitions.len(), "badge catalog seeded");
        Ok(inserted)
    }

    pub fn remove_definition(&self, slug: &BadgeSlug) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM badge_definitions WHERE slug = ?1", [slug.as_str()])?;
        Ok(removed == 1)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use similar_asserts::assert_eq;
    use starview_rules::{CatalogError, default_catalog};
    use starview_types::{ActivityEvent, UserId};

    use super::*;
    use crate::BadgeEngine;
    use crate::config::EngineConfig;
    use crate::error::EngineError;

    #[test]
    fn seeded_catalog_loads_back_unchanged() {
        let store = SqliteStore::in_memory().unwrap();
        let seed = default_catalog();
        assert_eq!(store.seed_catalog(&seed).unwrap(), seed.len());
        assert_eq!(store.seed_catalog(&seed).unwrap(), 0);

        let mut loaded = store.load_definitions().unwrap();
        let mut expected = seed;
        loaded.sort_by(|a, b| a.slug.cmp(&b.slug));
        expected.sort_by(|a, b| a.slug.cmp(&b.slug));
        assert_eq!(loaded, expected);
    }

    #[test]
    fn upsert_replaces_and_seed_preserves_edits() {
        let store = SqliteStore::in_memory().unwrap();
        let seed = default_catalog();
        store.seed_catalog(&seed).unwrap();

        let mut edited = seed.iter().find(|d| d.slug.as_str() == "photographer").unwrap().clone();
        edited.criteria_value = 30;
        store.upsert_definition(&edited).unwrap();
        store.seed_catalog(&seed).unwrap();

        let loaded = store.load_definitions().unwrap();
        let photographer = loaded.iter().find(|d| d.slug.as_str() == "photographer").unwrap();
        assert_eq!(photographer.criteria_value, 30);
    }

    fn insert_odd_row(store: &SqliteStore) {
        store
            .conn
            .lock()
            .execute(
                "INSERT INTO badge_definitions (slug, name, category, criteria_type, criteria_value, tier)
                 VALUES ('odd', 'Odd', 'ASTRONOMY', 'LOCATION_VISITS', 1, 1)",
                [],
            )
            .unwrap();
    }

    #[test]
    fn unknown_category_names_the_definition() {
        let store = SqliteStore::in_memory().unwrap();
        insert_odd_row(&store);
        match store.load_definitions() {
            Err(StoreError::InvalidDefinition { slug, reason }) => {
                assert_eq!(slug, "odd");
                assert_eq!(reason, "unknown category ASTRONOMY");
            }
            other => panic!("expected an invalid definition, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_definition_reaches_the_engine_as_a_catalog_error() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.seed_catalog(&default_catalog()).unwrap();
        let engine = BadgeEngine::with_store(store.clone(), &EngineConfig::default());
        engine.progress(UserId(1)).unwrap();

        insert_odd_row(&store);
        engine.invalidate_catalog();
        let err = engine.handle(&ActivityEvent::registered(UserId(1))).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Catalog(CatalogError::InvalidDefinition { ref slug, .. }) if slug == "odd"
        ));
        assert!(matches!(engine.progress(UserId(2)), Err(EngineError::Catalog(_))));
    }
}
