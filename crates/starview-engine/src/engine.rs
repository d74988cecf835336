use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use starview_rules::{BadgeCatalog, BurstPolicy, SweepMode, build_snapshot, plan_for, plan_sweep};
use starview_types::{
    ActivityEvent, AnomalyFlag, BadgeCategory, BadgeDefinition, BadgeSlug, CriteriaType, EventId,
    ProgressSnapshot, UserId,
};
use tracing::{debug, info, warn};

use crate::catalog_cache::CatalogCache;
use crate::config::EngineConfig;
use crate::error::{EngineError, StoreError};
use crate::progress_cache::ProgressCache;
use crate::store::{AppliedChange, AuditTrail, CatalogSource, FactStore, Ledger, PinStore, aggregate_for};

/// The storage seams the engine is built on.
#[derive(Clone)]
pub struct Collaborators {
    pub facts: Arc<dyn FactStore>,
    pub ledger: Arc<dyn Ledger>,
    pub pins: Arc<dyn PinStore>,
    pub audit: Arc<dyn AuditTrail>,
    pub catalog: Arc<dyn CatalogSource>,
}

impl Collaborators {
    /// Use one store for every seam.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: FactStore + Ledger + PinStore + AuditTrail + CatalogSource + 'static,
    {
        Self {
            facts: store.clone(),
            ledger: store.clone(),
            pins: store.clone(),
            audit: store.clone(),
            catalog: store,
        }
    }
}

/// One badge gained or lost by one user.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BadgeChange {
    pub user: UserId,
    pub badge: BadgeSlug,
}

/// A group sweep that was abandoned. The ledger was not touched for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationFailure {
    pub user: UserId,
    pub category: BadgeCategory,
    pub criteria: CriteriaType,
    pub reason: String,
}

/// Result of handling one activity event.
///
/// `awarded` holds only records this call inserted. A racing handler that
/// reached the same conclusion reports nothing for that badge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub event: EventId,
    pub awarded: Vec<BadgeChange>,
    pub revoked: Vec<BadgeChange>,
    pub failures: Vec<EvaluationFailure>,
    pub anomaly: Option<AnomalyFlag>,
}

impl TriggerOutcome {
    fn new(event: EventId) -> Self {
        Self {
            event,
            awarded: Vec::new(),
            revoked: Vec::new(),
            failures: Vec::new(),
            anomaly: None,
        }
    }

    fn record(&mut self, user: UserId, applied: AppliedChange) {
        self.awarded
            .extend(applied.awarded.into_iter().map(|badge| BadgeChange { user, badge }));
        self.revoked
            .extend(applied.revoked.into_iter().map(|badge| BadgeChange { user, badge }));
    }

    /// Badges awarded to `user`, in award order.
    pub fn awarded_to(&self, user: UserId) -> Vec<&str> {
        self.awarded
            .iter()
            .filter(|change| change.user == user)
            .map(|change| change.badge.as_str())
            .collect()
    }

    pub fn revoked_from(&self, user: UserId) -> Vec<&str> {
        self.revoked
            .iter()
            .filter(|change| change.user == user)
            .map(|change| change.badge.as_str())
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Badge engine: trigger dispatch, award/revoke, progress and pins.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct BadgeEngine {
    pub(crate) facts: Arc<dyn FactStore>,
    pub(crate) ledger: Arc<dyn Ledger>,
    pub(crate) pins: Arc<dyn PinStore>,
    audit: Arc<dyn AuditTrail>,
    pub(crate) catalog: CatalogCache,
    pub(crate) progress: ProgressCache,
    burst: BurstPolicy,
}

impl BadgeEngine {
    pub fn new(collaborators: Collaborators, config: &EngineConfig) -> Self {
        Self {
            facts: collaborators.facts,
            ledger: collaborators.ledger,
            pins: collaborators.pins,
            audit: collaborators.audit,
            catalog: CatalogCache::new(collaborators.catalog),
            progress: ProgressCache::new(config.progress_ttl_duration()),
            burst: config.burst_policy(),
        }
    }

    pub fn with_store<S>(store: Arc<S>, config: &EngineConfig) -> Self
    where
        S: FactStore + Ledger + PinStore + AuditTrail + CatalogSource + 'static,
    {
        Self::new(Collaborators::from_store(store), config)
    }

    /// Handle one activity event after its fact row was persisted.
    ///
    /// Only catalog problems and a failure to log the event are returned as
    /// errors. A failed group sweep is logged, listed in
    /// [`TriggerOutcome::failures`] and leaves the ledger untouched for that
    /// group; the other bindings still run.
    pub fn handle(&self, event: &ActivityEvent) -> Result<TriggerOutcome, EngineError> {
        let catalog = self.catalog.get()?;
        let event_id = self.ledger.allocate_event(event)?;
        debug!(
            event = %event_id,
            fact = event.fact.name(),
            outcome = event.outcome.name(),
            user = %event.user,
            "handling activity event"
        );

        let mut outcome = TriggerOutcome::new(event_id);
        self.dispatch(&catalog, event, event_id, &mut outcome);
        Ok(outcome)
    }

    fn dispatch(&self, catalog: &BadgeCatalog, event: &ActivityEvent, event_id: EventId, outcome: &mut TriggerOutcome) {
        let plan = plan_for(event.fact, event.outcome);
        let mut touched = BTreeSet::new();

        for binding in plan.bindings {
            let Some(user) = binding.target.resolve(event) else {
                warn!(
                    event = %event_id,
                    fact = event.fact.name(),
                    category = %binding.category,
                    criteria = %binding.criteria,
                    "binding skipped: event carries no related owner"
                );
                continue;
            };
            touched.insert(user);

            match self.sweep(catalog, user, binding.category, binding.criteria, binding.mode, event_id) {
                Ok(applied) => outcome.record(user, applied),
                Err(err) => {
                    warn!(
                        %user,
                        category = %binding.category,
                        criteria = %binding.criteria,
                        event = %event_id,
                        error = %err,
                        "badge evaluation failed, ledger left unchanged"
                    );
                    outcome.failures.push(EvaluationFailure {
                        user,
                        category: binding.category,
                        criteria: binding.criteria,
                        reason: err.to_string(),
                    });
                }
            }
        }

        for user in touched {
            self.progress.invalidate(user);
        }

        if plan.implicit_visit {
            self.implicit_visit(catalog, event, event_id, outcome);
        }
        if plan.anomaly_check {
            outcome.anomaly = self.check_burst(event.user, event.occurred_at);
        }
    }

    /// A review implies the reviewer was at the location.
    fn implicit_visit(&self, catalog: &BadgeCatalog, event: &ActivityEvent, event_id: EventId, outcome: &mut TriggerOutcome) {
        match self.facts.mark_visited(event.user, event.related, event.occurred_at) {
            Ok(true) => {
                debug!(user = %event.user, location = event.related, "implicit visit recorded");
                let visit = ActivityEvent::visit_recorded(event.user, event.related).at(event.occurred_at);
                self.dispatch(catalog, &visit, event_id, outcome);
            }
            Ok(false) => {}
            Err(err) => {
                warn!(user = %event.user, location = event.related, error = %err, "implicit visit not recorded");
                outcome.failures.push(EvaluationFailure {
                    user: event.user,
                    category: BadgeCategory::Exploration,
                    criteria: CriteriaType::LocationVisits,
                    reason: err.to_string(),
                });
            }
        }
    }

    /// Run one group sweep on demand, outside any activity event.
    pub fn evaluate(
        &self,
        user: UserId,
        category: BadgeCategory,
        criteria: CriteriaType,
        mode: SweepMode,
    ) -> Result<AppliedChange, EngineError> {
        let catalog = self.catalog.get()?;
        let event = self.ledger.allocate_maintenance_event(user, "EVALUATE")?;
        let applied = self.sweep(&catalog, user, category, criteria, mode, event)?;
        self.progress.invalidate(user);
        Ok(applied)
    }

    /// Aggregate, plan and apply one group for one user. All reads happen
    /// before the single ledger write.
    fn sweep(
        &self,
        catalog: &BadgeCatalog,
        user: UserId,
        category: BadgeCategory,
        criteria: CriteriaType,
        mode: SweepMode,
        event: EventId,
    ) -> Result<AppliedChange, StoreError> {
        let tiers = catalog.list_by_category(category, criteria);
        if tiers.is_empty() {
            return Ok(AppliedChange::default());
        }

        let aggregate = aggregate_for(criteria, self.facts.as_ref(), user)?;
        let held: HashSet<BadgeSlug> = self.ledger.held(user)?.into_iter().map(|r| r.badge).collect();
        let plan = plan_sweep(tiers, &aggregate, &held, mode);
        debug!(
            %user,
            %category,
            %criteria,
            value = aggregate.value,
            inspected = plan.inspected,
            award = plan.award.len(),
            revoke = plan.revoke.len(),
            "sweep planned"
        );
        if plan.is_empty() {
            return Ok(AppliedChange::default());
        }

        let applied = self.ledger.apply(user, &plan.award, &plan.revoke, event, Utc::now())?;
        for badge in &applied.awarded {
            info!(%user, %badge, %category, %criteria, %event, "badge awarded");
        }
        for badge in &applied.revoked {
            info!(%user, %badge, %category, %criteria, %event, "badge revoked");
        }
        Ok(applied)
    }

    fn check_burst(&self, user: UserId, now: DateTime<Utc>) -> Option<AnomalyFlag> {
        let visits = match self.facts.visits_since(user, self.burst.window_start(now)) {
            Ok(visits) => visits,
            Err(err) => {
                warn!(%user, error = %err, "visit burst check skipped");
                return None;
            }
        };
        let flag = self.burst.assess(user, visits, now)?;
        warn!(
            %user,
            visits,
            threshold = flag.threshold,
            window_secs = flag.window_secs,
            "visit burst flagged for review"
        );
        if let Err(err) = self.audit.flag(&flag) {
            warn!(%user, error = %err, "anomaly flag not stored");
        }
        Some(flag)
    }

    /// Full earned / in-progress / locked breakdown for one user.
    pub fn progress(&self, user: UserId) -> Result<Arc<ProgressSnapshot>, EngineError> {
        if let Some(snapshot) = self.progress.get(user) {
            debug!(%user, "progress cache hit");
            return Ok(snapshot);
        }
        debug!(%user, "progress cache miss");

        let generation = self.progress.generation(user);
        let catalog = self.catalog.get()?;
        let held = self.ledger.held(user)?;
        let mut aggregates = HashMap::new();
        for criteria in catalog.criteria_in_use() {
            aggregates.insert(criteria, aggregate_for(criteria, self.facts.as_ref(), user)?);
        }

        let snapshot = Arc::new(build_snapshot(user, &catalog, &held, &aggregates));
        self.progress.put(Arc::clone(&snapshot), generation);
        Ok(snapshot)
    }

    /// Definitions of badges awarded to `user` by event `since` or later.
    pub fn newly_earned(&self, user: UserId, since: EventId) -> Result<Vec<BadgeDefinition>, EngineError> {
        let catalog = self.catalog.get()?;
        let mut earned = Vec::new();
        for record in self.ledger.awarded_since(user, since)? {
            earned.push(catalog.get_by_slug(record.badge.as_str())?.clone());
        }
        Ok(earned)
    }

    /// Drop the cached catalog after an administrative edit.
    pub fn invalidate_catalog(&self) {
        self.catalog.invalidate();
    }

    /// Drop expired progress snapshots. Returns how many were removed.
    pub fn purge_expired_progress(&self) -> usize {
        self.progress.purge_expired()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use starview_rules::default_catalog;
    use starview_types::HelpfulRatio;

    use super::*;
    use crate::sqlite::SqliteStore;

    fn engine() -> (Arc<SqliteStore>, BadgeEngine) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.seed_catalog(&default_catalog()).unwrap();
        let engine = BadgeEngine::with_store(store.clone(), &EngineConfig::default());
        (store, engine)
    }

    #[test]
    fn review_on_unvisited_location_cascades_into_exploration() {
        let (store, engine) = engine();
        let (owner, reviewer) = (UserId(1), UserId(2));
        let location = store.add_location(owner).unwrap();
        engine.handle(&location.event).unwrap();

        let review = store.add_review(reviewer, location.id, 5).unwrap();
        let outcome = engine.handle(&review.event).unwrap();

        assert_eq!(outcome.awarded_to(reviewer), vec!["first-light"]);
        assert_eq!(engine.facts.location_visits(reviewer).unwrap(), 1);
        assert!(outcome.is_clean());
    }

    #[test]
    fn implicit_visit_is_not_repeated() {
        let (store, engine) = engine();
        let (owner, reviewer) = (UserId(1), UserId(2));
        let location = store.add_location(owner).unwrap().id;
        let visit = store.record_visit(reviewer, location).unwrap().unwrap();
        engine.handle(&visit).unwrap();

        let review = store.add_review(reviewer, location, 4).unwrap();
        let outcome = engine.handle(&review.event).unwrap();
        assert!(outcome.awarded_to(reviewer).is_empty());
        assert_eq!(engine.facts.location_visits(reviewer).unwrap(), 1);
    }

    #[test]
    fn manual_evaluation_awards_missed_tiers() {
        let (store, engine) = engine();
        let user = UserId(5);
        for _ in 0..5 {
            // Facts written without reporting the events.
            store.add_location(user).unwrap();
        }
        let applied = engine
            .evaluate(user, BadgeCategory::Contribution, CriteriaType::LocationsAdded, SweepMode::Award)
            .unwrap();
        assert_eq!(
            applied.awarded,
            vec![BadgeSlug::new("scout").unwrap(), BadgeSlug::new("discoverer").unwrap()]
        );
    }

    #[test]
    fn helpful_ratio_group_uses_one_combined_aggregate() {
        let (_, engine) = engine();
        let aggregate = aggregate_for(CriteriaType::HelpfulRatio, engine.facts.as_ref(), UserId(9)).unwrap();
        assert_eq!(aggregate.value, 0);
        assert_eq!(aggregate.ratio, Some(HelpfulRatio::new(0, 0)));
    }

    #[test]
    fn progress_is_cached_until_ttl() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.seed_catalog(&default_catalog()).unwrap();
        let engine = BadgeEngine::with_store(
            store.clone(),
            &EngineConfig::default().progress_ttl(Duration::from_secs(300)),
        );
        let first = engine.progress(UserId(1)).unwrap();
        let second = engine.progress(UserId(1)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
