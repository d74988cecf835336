//! Tier sweep: decides which badges of one `(category, criteria)` group to
//! award or revoke for a given aggregate.
//!
//! Pure: the caller supplies the aggregate and the held set, and applies the
//! resulting [`SweepPlan`] atomically. Nothing here touches storage, so a
//! failed aggregate read can never leave a partially applied sweep.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use starview_types::{Aggregate, BadgeDefinition, BadgeSlug, Comparison};

/// Which direction(s) of the state machine a trigger may move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SweepMode {
    /// The aggregate can only have risen: Unearned -> Earned.
    Award,
    /// The aggregate can only have fallen: Earned -> Unearned.
    Revoke,
    /// The aggregate may have moved either way.
    Full,
}

impl SweepMode {
    pub fn awards(&self) -> bool {
        matches!(self, Self::Award | Self::Full)
    }

    pub fn revokes(&self) -> bool {
        matches!(self, Self::Revoke | Self::Full)
    }
}

/// Ledger changes for one group. `inspected` counts predicate evaluations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepPlan {
    pub award: Vec<BadgeSlug>,
    pub revoke: Vec<BadgeSlug>,
    pub inspected: usize,
}

impl SweepPlan {
    pub fn is_empty(&self) -> bool {
        self.award.is_empty() && self.revoke.is_empty()
    }
}

/// Plan the sweep over `tiers`, which must be ascending by threshold as
/// returned by [`BadgeCatalog::list_by_category`](crate::BadgeCatalog::list_by_category).
///
/// Award pass walks from the easiest tier and stops at the first tier the
/// aggregate fails; strictly monotonic thresholds guarantee every later tier
/// fails too. Revoke pass walks from the hardest tier and stops at the first
/// tier the aggregate satisfies. Held non-revocable badges are skipped, never
/// revoked. Already-held badges are not re-awarded.
pub fn plan_sweep(
    tiers: &[BadgeDefinition],
    aggregate: &Aggregate,
    held: &HashSet<BadgeSlug>,
    mode: SweepMode,
) -> SweepPlan {
    let mut plan = SweepPlan::default();
    let comparison = tiers
        .first()
        .map(|d| d.criteria_type.comparison())
        .unwrap_or(Comparison::AtLeast);

    if mode.awards() {
        for def in easiest_first(tiers, comparison) {
            plan.inspected += 1;
            if !def.is_satisfied_by(aggregate) {
                break;
            }
            if !held.contains(&def.slug) {
                plan.award.push(def.slug.clone());
            }
        }
    }

    if mode.revokes() {
        for def in easiest_first(tiers, comparison).rev() {
            plan.inspected += 1;
            if def.is_satisfied_by(aggregate) {
                break;
            }
            if held.contains(&def.slug) && def.is_revocable() {
                plan.revoke.push(def.slug.clone());
            }
        }
    }

    plan
}

/// Revocation check for held badges only, used by the reconciliation sweep.
///
/// Returns held revocable badges of the group that the aggregate no longer
/// satisfies.
pub fn stale_holdings(
    tiers: &[BadgeDefinition],
    aggregate: &Aggregate,
    held: &HashSet<BadgeSlug>,
) -> Vec<BadgeSlug> {
    tiers
        .iter()
        .filter(|def| held.contains(&def.slug) && def.is_revocable())
        .filter(|def| !def.is_satisfied_by(aggregate))
        .map(|def| def.slug.clone())
        .collect()
}

fn easiest_first(
    tiers: &[BadgeDefinition],
    comparison: Comparison,
) -> Box<dyn DoubleEndedIterator<Item = &BadgeDefinition> + '_> {
    match comparison {
        Comparison::AtLeast => Box::new(tiers.iter()),
        Comparison::AtMost => Box::new(tiers.iter().rev()),
    }
}
