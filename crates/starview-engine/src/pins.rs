use std::collections::HashSet;

use starview_types::{BadgeSlug, UserId};
use tracing::info;

use crate::config::MAX_PINNED_BADGES;
use crate::engine::BadgeEngine;
use crate::error::{EngineError, PinError};

impl BadgeEngine {
    /// Replace the user's pinned set, in display order.
    ///
    /// Every slug must name a catalog badge the user holds, with no repeats
    /// and at most [`MAX_PINNED_BADGES`] of them. Any violation rejects the
    /// whole request and leaves the stored set as it was. An empty request
    /// clears the pins.
    pub fn pin<S: AsRef<str>>(&self, user: UserId, slugs: &[S]) -> Result<(), PinError> {
        if slugs.len() > MAX_PINNED_BADGES {
            return Err(PinError::TooMany {
                requested: slugs.len(),
                max: MAX_PINNED_BADGES,
            });
        }

        let catalog = self.catalog.get()?;
        let held: HashSet<BadgeSlug> = self.ledger.held(user)?.into_iter().map(|r| r.badge).collect();

        let mut accepted: Vec<BadgeSlug> = Vec::with_capacity(slugs.len());
        for raw in slugs {
            let raw = raw.as_ref();
            let def = catalog
                .get_by_slug(raw)
                .map_err(|_| PinError::UnknownBadge(raw.to_string()))?;
            if accepted.contains(&def.slug) {
                return Err(PinError::Duplicate(def.slug.clone()));
            }
            if !held.contains(&def.slug) {
                return Err(PinError::NotHeld(def.slug.clone()));
            }
            accepted.push(def.slug.clone());
        }

        // Holdings may have changed since they were read above.
        if let Some(revoked) = self.pins.replace_pinned(user, &accepted)? {
            return Err(PinError::NotHeld(revoked));
        }
        self.progress.invalidate(user);
        info!(%user, pinned = accepted.len(), "pinned badges replaced");
        Ok(())
    }

    pub fn pinned(&self, user: UserId) -> Result<Vec<BadgeSlug>, EngineError> {
        Ok(self.pins.pinned(user)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use starview_rules::default_catalog;
    use starview_types::ActivityEvent;

    use super::*;
    use crate::config::EngineConfig;
    use crate::sqlite::SqliteStore;
    use crate::store::Ledger;

    fn engine_with_held(user: UserId, held: &[&str]) -> (Arc<SqliteStore>, BadgeEngine) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.seed_catalog(&default_catalog()).unwrap();
        let event = store.allocate_event(&ActivityEvent::registered(user)).unwrap();
        let slugs: Vec<BadgeSlug> = held.iter().map(|s| BadgeSlug::new(*s).unwrap()).collect();
        store.apply(user, &slugs, &[], event, Utc::now()).unwrap();
        let engine = BadgeEngine::with_store(store.clone(), &EngineConfig::default());
        (store, engine)
    }

    #[test]
    fn four_slugs_are_rejected_entirely() {
        let user = UserId(1);
        let (_, engine) = engine_with_held(user, &["scout", "explorer", "first-light", "pioneer"]);
        engine.pin(user, &["scout"]).unwrap();

        let err = engine.pin(user, &["scout", "explorer", "first-light", "pioneer"]).unwrap_err();
        assert!(matches!(err, PinError::TooMany { requested: 4, max: 3 }));
        assert_eq!(engine.pinned(user).unwrap(), vec![BadgeSlug::new("scout").unwrap()]);
    }

    #[test]
    fn unheld_badge_rejects_without_mutation() {
        let user = UserId(1);
        let (_, engine) = engine_with_held(user, &["scout", "explorer"]);
        engine.pin(user, &["explorer", "scout"]).unwrap();

        let err = engine.pin(user, &["scout", "stargazer"]).unwrap_err();
        assert!(matches!(err, PinError::NotHeld(ref slug) if slug.as_str() == "stargazer"));
        assert_eq!(
            engine.pinned(user).unwrap(),
            vec![BadgeSlug::new("explorer").unwrap(), BadgeSlug::new("scout").unwrap()]
        );
    }

    #[test]
    fn duplicates_and_unknown_slugs_are_rejected() {
        let user = UserId(1);
        let (_, engine) = engine_with_held(user, &["scout"]);
        assert!(matches!(engine.pin(user, &["scout", "scout"]), Err(PinError::Duplicate(_))));
        assert!(matches!(engine.pin(user, &["Not A Slug"]), Err(PinError::UnknownBadge(_))));
        assert!(engine.pinned(user).unwrap().is_empty());
    }

    #[test]
    fn empty_request_clears_pins() {
        let user = UserId(1);
        let (_, engine) = engine_with_held(user, &["scout"]);
        engine.pin(user, &["scout"]).unwrap();
        engine.pin::<&str>(user, &[]).unwrap();
        assert!(engine.pinned(user).unwrap().is_empty());
    }
}
