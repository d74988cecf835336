use chrono::{DateTime, Utc};
use rusqlite::{Connection, Params, params};
use starview_types::{AchievementRecord, ActivityEvent, AnomalyFlag, BadgeSlug, EntityId, EventId, UserId};
use tracing::debug;

use super::{SqliteStore, from_millis, millis, to_count};
use crate::error::StoreError;
use crate::store::{AppliedChange, AuditTrail, Ledger, PinStore};

impl Ledger for SqliteStore {
    fn allocate_event(&self, event: &ActivityEvent) -> Result<EventId, StoreError> {
        insert_event(
            &self.conn.lock(),
            event.fact.name(),
            event.outcome.name(),
            event.user,
            event.related,
            event.related_owner,
            event.occurred_at,
        )
    }

    fn allocate_maintenance_event(&self, user: UserId, reason: &str) -> Result<EventId, StoreError> {
        insert_event(&self.conn.lock(), reason, "MAINTENANCE", user, user.0, None, Utc::now())
    }

    fn held(&self, user: UserId) -> Result<Vec<AchievementRecord>, StoreError> {
        let conn = self.conn.lock();
        query_records(
            &conn,
            "SELECT badge, earned_at, event FROM achievements WHERE user = ?1 ORDER BY event, badge",
            [user.0],
            user,
        )
    }

    fn apply(
        &self,
        user: UserId,
        award: &[BadgeSlug],
        revoke: &[BadgeSlug],
        event: EventId,
        at: DateTime<Utc>,
    ) -> Result<AppliedChange, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut applied = AppliedChange::default();
        let event_id = i64::try_from(event.0)
            .map_err(|_| StoreError::corrupt("activity_events", format!("event {event} out of range")))?;

        for badge in award {
            let inserted = tx.execute(
                "INSERT INTO achievements (user, badge, earned_at, event) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user, badge) DO NOTHING",
                params![user.0, badge.as_str(), millis(at), event_id],
            )?;
            if inserted == 1 {
                applied.awarded.push(badge.clone());
            }
        }

        for badge in revoke {
            let deleted = tx.execute(
                "DELETE FROM achievements WHERE user = ?1 AND badge = ?2",
                params![user.0, badge.as_str()],
            )?;
            if deleted == 1 {
                // A pinned badge must be held.
                tx.execute(
                    "DELETE FROM pinned_badges WHERE user = ?1 AND badge = ?2",
                    params![user.0, badge.as_str()],
                )?;
                applied.revoked.push(badge.clone());
            }
        }

        tx.commit()?;
        Ok(applied)
    }

    fn awarded_since(&self, user: UserId, since: EventId) -> Result<Vec<AchievementRecord>, StoreError> {
        let conn = self.conn.lock();
        let since = i64::try_from(since.0).unwrap_or(i64::MAX);
        query_records(
            &conn,
            "SELECT badge, earned_at, event FROM achievements
             WHERE user = ?1 AND event >= ?2 ORDER BY event, badge",
            params![user.0, since],
            user,
        )
    }

    fn users_with_records(&self) -> Result<Vec<UserId>, StoreError> {
        let conn = self.conn.lock();
        let users = conn
            .prepare("SELECT DISTINCT user FROM achievements ORDER BY user")?
            .query_map([], |row| row.get(0).map(UserId))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

fn insert_event(
    conn: &Connection,
    fact: &str,
    outcome: &str,
    user: UserId,
    related: EntityId,
    related_owner: Option<UserId>,
    occurred_at: DateTime<Utc>,
) -> Result<EventId, StoreError> {
    conn.prepare_cached(
        "INSERT INTO activity_events (fact, outcome, user, related, related_owner, occurred_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?
    .execute(params![
        fact,
        outcome,
        user.0,
        related,
        related_owner.map(|owner| owner.0),
        millis(occurred_at),
    ])?;
    let id = conn.last_insert_rowid();
    u64::try_from(id)
        .map(EventId)
        .map_err(|_| StoreError::corrupt("activity_events", format!("negative id {id}")))
}

fn query_records<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    user: UserId,
) -> Result<Vec<AchievementRecord>, StoreError> {
    let rows: Vec<(String, i64, i64)> = conn
        .prepare_cached(sql)?
        .query_map(params, |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(badge, earned_at, event)| {
            Ok(AchievementRecord {
                user,
                badge: BadgeSlug::new(badge).map_err(|err| StoreError::corrupt("achievements", err))?,
                earned_at: from_millis("achievements", earned_at)?,
                event: EventId(to_count("achievements", event)?),
            })
        })
        .collect()
}

impl PinStore for SqliteStore {
    fn pinned(&self, user: UserId) -> Result<Vec<BadgeSlug>, StoreError> {
        let conn = self.conn.lock();
        let raw: Vec<String> = conn
            .prepare_cached("SELECT badge FROM pinned_badges WHERE user = ?1 ORDER BY position")?
            .query_map([user.0], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter()
            .map(|slug| BadgeSlug::new(slug).map_err(|err| StoreError::corrupt("pinned_badges", err)))
            .collect()
    }

    fn replace_pinned(&self, user: UserId, badges: &[BadgeSlug]) -> Result<Option<BadgeSlug>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM pinned_badges WHERE user = ?1", [user.0])?;
        for (position, badge) in badges.iter().enumerate() {
            let inserted = tx.execute(
                "INSERT INTO pinned_badges (user, badge, position)
                 SELECT ?1, ?2, ?3 WHERE EXISTS
                     (SELECT 1 FROM achievements WHERE user = ?1 AND badge = ?2)",
                params![user.0, badge.as_str(), position as i64],
            )?;
            if inserted == 0 {
                // Dropping the transaction rolls back the delete.
                return Ok(Some(badge.clone()));
            }
        }
        tx.commit()?;
        Ok(None)
    }
}

impl AuditTrail for SqliteStore {
    fn flag(&self, flag: &AnomalyFlag) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO anomaly_flags (user, visits_in_window, threshold, window_secs, flagged_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                flag.user.0,
                i64::try_from(flag.visits_in_window).unwrap_or(i64::MAX),
                i64::try_from(flag.threshold).unwrap_or(i64::MAX),
                i64::try_from(flag.window_secs).unwrap_or(i64::MAX),
                millis(flag.flagged_at),
            ],
        )?;
        debug!(user = %flag.user, visits = flag.visits_in_window, "anomaly flag stored");
        Ok(())
    }
}

impl SqliteStore {
    /// Audit trail for one user, oldest first.
    pub fn anomaly_flags(&self, user: UserId) -> Result<Vec<AnomalyFlag>, StoreError> {
        let conn = self.conn.lock();
        let rows: Vec<(i64, i64, i64, i64)> = conn
            .prepare_cached(
                "SELECT visits_in_window, threshold, window_secs, flagged_at
                 FROM anomaly_flags WHERE user = ?1 ORDER BY id",
            )?
            .query_map([user.0], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(visits, threshold, window_secs, flagged_at)| {
                Ok(AnomalyFlag {
                    user,
                    visits_in_window: to_count("anomaly_flags", visits)?,
                    threshold: to_count("anomaly_flags", threshold)?,
                    window_secs: to_count("anomaly_flags", window_secs)?,
                    flagged_at: from_millis("anomaly_flags", flagged_at)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slug(raw: &str) -> BadgeSlug {
        BadgeSlug::new(raw).unwrap()
    }

    #[test]
    fn award_is_reported_once_and_keeps_first_timestamp() {
        let store = SqliteStore::in_memory().unwrap();
        let user = UserId(1);
        let first = store.allocate_event(&ActivityEvent::visit_recorded(user, 1)).unwrap();
        let second = store.allocate_event(&ActivityEvent::visit_recorded(user, 2)).unwrap();
        assert!(second > first);

        let t0 = Utc::now();
        let applied = store.apply(user, &[slug("explorer")], &[], first, t0).unwrap();
        assert_eq!(applied.awarded, vec![slug("explorer")]);

        let later = t0 + chrono::Duration::minutes(5);
        let again = store.apply(user, &[slug("explorer")], &[], second, later).unwrap();
        assert!(again.is_empty());

        let held = store.held(user).unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].earned_at.timestamp_millis(), t0.timestamp_millis());
        assert_eq!(held[0].event, first);
    }

    #[test]
    fn revocation_also_unpins() {
        let store = SqliteStore::in_memory().unwrap();
        let user = UserId(1);
        let event = store.allocate_event(&ActivityEvent::registered(user)).unwrap();
        store.apply(user, &[slug("reviewer")], &[], event, Utc::now()).unwrap();
        assert_eq!(store.replace_pinned(user, &[slug("reviewer")]).unwrap(), None);

        let applied = store.apply(user, &[], &[slug("reviewer"), slug("never-held")], event, Utc::now()).unwrap();
        assert_eq!(applied.revoked, vec![slug("reviewer")]);
        assert!(store.pinned(user).unwrap().is_empty());
    }

    #[test]
    fn awarded_since_is_inclusive() {
        let store = SqliteStore::in_memory().unwrap();
        let user = UserId(1);
        let e1 = store.allocate_event(&ActivityEvent::visit_recorded(user, 1)).unwrap();
        let e2 = store.allocate_event(&ActivityEvent::visit_recorded(user, 2)).unwrap();
        store.apply(user, &[slug("first-light")], &[], e1, Utc::now()).unwrap();
        store.apply(user, &[slug("explorer")], &[], e2, Utc::now()).unwrap();

        let since: Vec<BadgeSlug> = store.awarded_since(user, e2).unwrap().into_iter().map(|r| r.badge).collect();
        assert_eq!(since, vec![slug("explorer")]);
        assert_eq!(store.awarded_since(user, e1).unwrap().len(), 2);
        assert_eq!(store.users_with_records().unwrap(), vec![user]);
    }

    #[test]
    fn maintenance_events_share_the_sequence() {
        let store = SqliteStore::in_memory().unwrap();
        let first = store.allocate_event(&ActivityEvent::registered(UserId(1))).unwrap();
        let sweep = store.allocate_maintenance_event(UserId(1), "RECONCILE").unwrap();
        assert!(sweep > first);
    }

    #[test]
    fn pins_keep_their_order() {
        let store = SqliteStore::in_memory().unwrap();
        let user = UserId(4);
        let order = vec![slug("pioneer"), slug("explorer"), slug("scout")];
        let event = store.allocate_event(&ActivityEvent::registered(user)).unwrap();
        store.apply(user, &order, &[], event, Utc::now()).unwrap();
        assert_eq!(store.replace_pinned(user, &order).unwrap(), None);
        assert_eq!(store.pinned(user).unwrap(), order);
    }

    #[test]
    fn pinning_a_badge_revoked_meanwhile_writes_nothing() {
        let store = SqliteStore::in_memory().unwrap();
        let user = UserId(4);
        let event = store.allocate_event(&ActivityEvent::registered(user)).unwrap();
        store.apply(user, &[slug("pioneer"), slug("explorer")], &[], event, Utc::now()).unwrap();
        store.replace_pinned(user, &[slug("pioneer")]).unwrap();

        // Revoked after the caller checked holdings, before it wrote the pins.
        store.apply(user, &[], &[slug("explorer")], event, Utc::now()).unwrap();
        let refused = store.replace_pinned(user, &[slug("explorer"), slug("pioneer")]).unwrap();
        assert_eq!(refused, Some(slug("explorer")));
        assert_eq!(store.pinned(user).unwrap(), vec![slug("pioneer")]);
    }
}
