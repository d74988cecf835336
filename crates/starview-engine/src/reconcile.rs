//! Out-of-band drift correction for bulk data changes that bypassed the
//! trigger path. Revokes only; non-revocable badges are never touched.

use std::collections::HashSet;

use chrono::Utc;
use starview_rules::{BadgeCatalog, stale_holdings};
use starview_types::{BadgeSlug, UserId};
use tracing::{error, info};

use crate::engine::{BadgeChange, BadgeEngine};
use crate::error::{EngineError, StoreError};
use crate::store::aggregate_for;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileFailure {
    pub user: UserId,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub users_checked: usize,
    pub revoked: Vec<BadgeChange>,
    pub failures: Vec<ReconcileFailure>,
}

impl BadgeEngine {
    /// Walk every user holding a badge and revoke held revocable badges they
    /// no longer qualify for. One user's failure is logged and the sweep
    /// moves on.
    pub fn reconcile(&self) -> Result<ReconcileReport, EngineError> {
        let catalog = self.catalog.get()?;
        let mut report = ReconcileReport::default();

        for user in self.ledger.users_with_records()? {
            report.users_checked += 1;
            match self.reconcile_user(&catalog, user) {
                Ok(revoked) => {
                    if !revoked.is_empty() {
                        self.progress.invalidate(user);
                    }
                    report
                        .revoked
                        .extend(revoked.into_iter().map(|badge| BadgeChange { user, badge }));
                }
                Err(err) => {
                    error!(%user, error = %err, "reconciliation failed for user");
                    report.failures.push(ReconcileFailure {
                        user,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            users_checked = report.users_checked,
            revoked = report.revoked.len(),
            failures = report.failures.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    fn reconcile_user(&self, catalog: &BadgeCatalog, user: UserId) -> Result<Vec<BadgeSlug>, StoreError> {
        let held: HashSet<BadgeSlug> = self.ledger.held(user)?.into_iter().map(|r| r.badge).collect();

        let mut stale = Vec::new();
        for (_, criteria, tiers) in catalog.groups() {
            if !tiers.iter().any(|def| def.is_revocable() && held.contains(&def.slug)) {
                continue;
            }
            let aggregate = aggregate_for(criteria, self.facts.as_ref(), user)?;
            stale.extend(stale_holdings(tiers, &aggregate, &held));
        }
        if stale.is_empty() {
            return Ok(stale);
        }

        let event = self.ledger.allocate_maintenance_event(user, "RECONCILE")?;
        let applied = self.ledger.apply(user, &[], &stale, event, Utc::now())?;
        for badge in &applied.revoked {
            info!(%user, %badge, %event, "stale badge revoked");
        }
        Ok(applied.revoked)
    }
}
