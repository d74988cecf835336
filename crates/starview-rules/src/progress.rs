use std::collections::HashMap;

use starview_types::{
    AchievementRecord, Aggregate, BadgeSlug, Comparison, CriteriaType, EarnedBadge,
    InProgressBadge, LockedBadge, ProgressSnapshot, UserId,
};

use crate::catalog::BadgeCatalog;

/// Highest percentage shown for an unearned badge. 100 means earned.
pub const MAX_UNEARNED_PERCENT: u8 = 99;

/// `floor(current / threshold * 100)`, clamped to `0..=99`.
pub fn progress_percentage(current: u64, threshold: u64) -> u8 {
    if threshold == 0 {
        return 0;
    }
    let percent = current.saturating_mul(100) / threshold;
    percent.min(u64::from(MAX_UNEARNED_PERCENT)) as u8
}

/// Partition the whole catalog for one user.
///
/// The ledger decides `earned`: a held record is earned even if the aggregate
/// has since dropped (revocation is the evaluator's job, not the reader's).
/// Unearned badges with a started aggregate are `in_progress`, the rest are
/// `locked`. Rank-style badges have no meaningful progress and stay locked
/// until earned. Records for slugs no longer in the catalog are ignored.
pub fn build_snapshot(
    user: UserId,
    catalog: &BadgeCatalog,
    held: &[AchievementRecord],
    aggregates: &HashMap<CriteriaType, Aggregate>,
) -> ProgressSnapshot {
    let held: HashMap<&BadgeSlug, &AchievementRecord> = held.iter().map(|r| (&r.badge, r)).collect();
    let mut snapshot = ProgressSnapshot {
        user,
        earned: Vec::new(),
        in_progress: Vec::new(),
        locked: Vec::new(),
    };

    for def in catalog.iter() {
        if let Some(record) = held.get(&def.slug) {
            snapshot.earned.push(EarnedBadge {
                badge: def.clone(),
                earned_at: record.earned_at,
            });
            continue;
        }

        let aggregate = aggregates.get(&def.criteria_type).copied().unwrap_or_default();
        let trackable = def.criteria_type.comparison() == Comparison::AtLeast;
        if trackable && aggregate.is_started() {
            snapshot.in_progress.push(InProgressBadge {
                badge: def.clone(),
                current: aggregate.value,
                percentage: progress_percentage(aggregate.value, def.criteria_value),
            });
        } else {
            snapshot.locked.push(LockedBadge { badge: def.clone() });
        }
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use starview_types::{EventId, HelpfulRatio};

    use super::*;
    use crate::seed::default_catalog;

    fn record(user: UserId, slug: &str) -> AchievementRecord {
        AchievementRecord {
            user,
            badge: BadgeSlug::new(slug).unwrap(),
            earned_at: Utc::now(),
            event: EventId(1),
        }
    }

    #[test]
    fn percentage_floors_and_clamps() {
        assert_eq!(progress_percentage(0, 5), 0);
        assert_eq!(progress_percentage(4, 5), 80);
        assert_eq!(progress_percentage(1, 3), 33);
        assert_eq!(progress_percentage(999, 1000), 99);
        // Over threshold but unearned (e.g. secondary not met) still caps at 99.
        assert_eq!(progress_percentage(30, 25), 99);
    }

    #[test]
    fn partitions_cover_the_whole_catalog() {
        let catalog = BadgeCatalog::build(default_catalog()).unwrap();
        let user = UserId(7);
        let aggregates = HashMap::from([
            (CriteriaType::LocationVisits, Aggregate::count(4)),
            (CriteriaType::TenureRank, Aggregate::count(250)),
        ]);
        let snapshot = build_snapshot(user, &catalog, &[record(user, "first-light")], &aggregates);

        assert_eq!(snapshot.total(), catalog.len());
        assert!(snapshot.is_earned("first-light"));
        let explorer = snapshot.in_progress_for("explorer").unwrap();
        assert_eq!((explorer.current, explorer.percentage), (4, 80));
        assert_eq!(snapshot.in_progress_for("stargazer").unwrap().percentage, 8);
        assert!(snapshot.is_locked("scout"));
        assert!(snapshot.is_locked("pioneer"));
    }

    #[test]
    fn unmet_secondary_never_shows_complete() {
        let catalog = BadgeCatalog::build(default_catalog()).unwrap();
        let aggregates = HashMap::from([(
            CriteriaType::HelpfulRatio,
            Aggregate::with_ratio(30, HelpfulRatio::new(1, 10)),
        )]);
        let snapshot = build_snapshot(UserId(1), &catalog, &[], &aggregates);

        let expert = snapshot.in_progress_for("expert-reviewer").unwrap();
        assert_eq!(expert.percentage, MAX_UNEARNED_PERCENT);
        assert!(!snapshot.is_earned("expert-reviewer"));
    }

    #[test]
    fn records_outside_catalog_are_ignored() {
        let catalog = BadgeCatalog::build(default_catalog()).unwrap();
        let user = UserId(3);
        let snapshot = build_snapshot(user, &catalog, &[record(user, "retired-badge")], &HashMap::new());
        assert!(snapshot.earned.is_empty());
        assert_eq!(snapshot.locked.len(), catalog.len());
    }
}
