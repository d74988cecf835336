//! Activity writes. Each method persists the fact and returns the event(s)
//! the caller hands to [`BadgeEngine::handle`](crate::BadgeEngine::handle).
//! Cascading deletes return one event per removed fact.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Transaction, params};
use starview_types::{ActivityEvent, EntityId, FactOutcome, FactType, UserId};
use tracing::debug;

use super::{SqliteStore, millis};
use crate::error::StoreError;

/// A newly inserted fact row and the event describing it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recorded {
    pub id: EntityId,
    pub event: ActivityEvent,
}

impl SqliteStore {
    /// Register a user; the registration rank is the next in sequence.
    /// Ranks are never reused, even after [`delete_user`](Self::delete_user).
    pub fn register_user(&self, user: UserId) -> Result<ActivityEvent, StoreError> {
        let event = ActivityEvent::registered(user);
        let joined_at = millis(event.occurred_at);
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO registrations (user, registered_at) VALUES (?1, ?2)",
            params![user.0, joined_at],
        )?;
        let rank = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO users (id, registration_rank, joined_at) VALUES (?1, ?2, ?3)",
            params![user.0, rank, joined_at],
        )?;
        tx.commit()?;
        Ok(event)
    }

    pub fn set_profile_completeness(&self, user: UserId, percent: u8) -> Result<ActivityEvent, StoreError> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE users SET profile_completeness = ?2 WHERE id = ?1",
            params![user.0, percent],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound { table: "users", id: user.0 });
        }
        Ok(ActivityEvent::profile_updated(user))
    }

    /// Remove a user's badge state: achievements, pins and anomaly flags.
    /// Activity rows belong to the host application and are left alone, as
    /// does the registration ledger.
    pub fn delete_user(&self, user: UserId) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let achievements = tx.execute("DELETE FROM achievements WHERE user = ?1", [user.0])?;
        tx.execute("DELETE FROM pinned_badges WHERE user = ?1", [user.0])?;
        tx.execute("DELETE FROM anomaly_flags WHERE user = ?1", [user.0])?;
        tx.execute("DELETE FROM users WHERE id = ?1", [user.0])?;
        tx.commit()?;
        debug!(%user, achievements, "user badge state deleted");
        Ok(())
    }

    pub fn add_location(&self, author: UserId) -> Result<Recorded, StoreError> {
        let conn = self.conn.lock();
        conn.execute("INSERT INTO locations (author) VALUES (?1)", [author.0])?;
        let id = conn.last_insert_rowid();
        Ok(Recorded {
            id,
            event: ActivityEvent::location_authored(author, id),
        })
    }

    /// Delete a location with its visits and reviews (and their votes and
    /// comments). The location event comes first.
    pub fn remove_location(&self, location: EntityId) -> Result<Vec<ActivityEvent>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let author = location_author(&tx, location)?;

        let mut events = vec![ActivityEvent::location_removed(author, location)];
        let visitors: Vec<i64> = tx
            .prepare("SELECT user FROM visits WHERE location = ?1 ORDER BY user")?
            .query_map([location], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        tx.execute("DELETE FROM visits WHERE location = ?1", [location])?;
        events.extend(visitors.into_iter().map(|user| ActivityEvent::visit_removed(UserId(user), location)));

        let reviews: Vec<i64> = tx
            .prepare("SELECT id FROM reviews WHERE location = ?1 ORDER BY id")?
            .query_map([location], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for review in reviews {
            delete_review(&tx, review, &mut events)?;
        }

        tx.execute("DELETE FROM locations WHERE id = ?1", [location])?;
        tx.commit()?;
        Ok(events)
    }

    /// Record a visit now. `None` when the user already visited.
    pub fn record_visit(&self, user: UserId, location: EntityId) -> Result<Option<ActivityEvent>, StoreError> {
        self.record_visit_at(user, location, Utc::now())
    }

    pub fn record_visit_at(
        &self,
        user: UserId,
        location: EntityId,
        at: DateTime<Utc>,
    ) -> Result<Option<ActivityEvent>, StoreError> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO visits (user, location, visited_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (user, location) DO NOTHING",
            params![user.0, location, millis(at)],
        )?;
        Ok((inserted == 1).then(|| ActivityEvent::visit_recorded(user, location).at(at)))
    }

    pub fn remove_visit(&self, user: UserId, location: EntityId) -> Result<Option<ActivityEvent>, StoreError> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM visits WHERE user = ?1 AND location = ?2",
            params![user.0, location],
        )?;
        Ok((removed == 1).then(|| ActivityEvent::visit_removed(user, location)))
    }

    /// Insert a review and fold its rating into the location aggregate,
    /// unless the reviewer is the location's author.
    pub fn add_review(&self, author: UserId, location: EntityId, rating: u8) -> Result<Recorded, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let location_author = location_author(&tx, location)?;
        tx.execute(
            "INSERT INTO reviews (author, location, rating) VALUES (?1, ?2, ?3)",
            params![author.0, location, rating],
        )?;
        let id = tx.last_insert_rowid();
        if author != location_author {
            adjust_rating(&tx, location, i64::from(rating), 1)?;
        }
        tx.commit()?;
        Ok(Recorded {
            id,
            event: ActivityEvent::review_authored(author, location, location_author),
        })
    }

    pub fn update_review_rating(&self, review: EntityId, rating: u8) -> Result<ActivityEvent, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let (author, location, old): (i64, EntityId, i64) = tx
            .query_row(
                "SELECT author, location, rating FROM reviews WHERE id = ?1",
                [review],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
            .ok_or(StoreError::NotFound { table: "reviews", id: review })?;
        let location_author = location_author(&tx, location)?;

        tx.execute("UPDATE reviews SET rating = ?2 WHERE id = ?1", params![review, rating])?;
        if UserId(author) != location_author {
            adjust_rating(&tx, location, i64::from(rating) - old, 0)?;
        }
        tx.commit()?;
        Ok(ActivityEvent::new(
            FactType::Review,
            FactOutcome::Changed,
            UserId(author),
            location,
            Some(location_author),
        ))
    }

    /// Delete a review with its votes and comments.
    pub fn remove_review(&self, review: EntityId) -> Result<Vec<ActivityEvent>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut events = Vec::new();
        delete_review(&tx, review, &mut events)?;
        tx.commit()?;
        Ok(events)
    }

    /// Cast or change a vote. A repeated identical vote still reports a change.
    pub fn cast_vote(&self, voter: UserId, review: EntityId, helpful: bool) -> Result<ActivityEvent, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let review_author = review_author(&tx, review)?;
        let existed = tx
            .query_row(
                "SELECT 1 FROM votes WHERE voter = ?1 AND review = ?2",
                params![voter.0, review],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        tx.execute(
            "INSERT INTO votes (voter, review, helpful) VALUES (?1, ?2, ?3)
             ON CONFLICT (voter, review) DO UPDATE SET helpful = excluded.helpful",
            params![voter.0, review, helpful],
        )?;
        tx.commit()?;
        Ok(if existed {
            ActivityEvent::vote_changed(voter, review, review_author)
        } else {
            ActivityEvent::vote_cast(voter, review, review_author)
        })
    }

    pub fn remove_vote(&self, voter: UserId, review: EntityId) -> Result<Option<ActivityEvent>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let review_author = review_author(&tx, review)?;
        let removed = tx.execute(
            "DELETE FROM votes WHERE voter = ?1 AND review = ?2",
            params![voter.0, review],
        )?;
        tx.commit()?;
        Ok((removed == 1).then(|| ActivityEvent::vote_removed(voter, review, review_author)))
    }

    /// `None` when already following. Following oneself is rejected by the schema.
    pub fn follow(&self, follower: UserId, followed: UserId) -> Result<Option<ActivityEvent>, StoreError> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO follows (follower, followed) VALUES (?1, ?2)
             ON CONFLICT (follower, followed) DO NOTHING",
            params![follower.0, followed.0],
        )?;
        Ok((inserted == 1).then(|| ActivityEvent::follow_created(follower, followed)))
    }

    pub fn unfollow(&self, follower: UserId, followed: UserId) -> Result<Option<ActivityEvent>, StoreError> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM follows WHERE follower = ?1 AND followed = ?2",
            params![follower.0, followed.0],
        )?;
        Ok((removed == 1).then(|| ActivityEvent::follow_removed(follower, followed)))
    }

    pub fn add_comment(&self, author: UserId, review: EntityId) -> Result<Recorded, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let review_author = review_author(&tx, review)?;
        tx.execute(
            "INSERT INTO comments (author, review) VALUES (?1, ?2)",
            params![author.0, review],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Recorded {
            id,
            event: ActivityEvent::comment_authored(author, review, review_author),
        })
    }

    pub fn remove_comment(&self, comment: EntityId) -> Result<Option<ActivityEvent>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let row: Option<(i64, EntityId, Option<i64>)> = tx
            .query_row(
                "SELECT c.author, c.review, r.author FROM comments c
                 LEFT JOIN reviews r ON r.id = c.review WHERE c.id = ?1",
                [comment],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((author, review, review_author)) = row else {
            return Ok(None);
        };
        tx.execute("DELETE FROM comments WHERE id = ?1", [comment])?;
        tx.commit()?;
        let author = UserId(author);
        Ok(Some(ActivityEvent::comment_removed(
            author,
            review,
            review_author.map_or(author, UserId),
        )))
    }

    pub fn add_photo(&self, owner: UserId) -> Result<Recorded, StoreError> {
        let conn = self.conn.lock();
        conn.execute("INSERT INTO photos (owner) VALUES (?1)", [owner.0])?;
        let id = conn.last_insert_rowid();
        Ok(Recorded {
            id,
            event: ActivityEvent::photo_uploaded(owner, id),
        })
    }

    pub fn remove_photo(&self, photo: EntityId) -> Result<Option<ActivityEvent>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let owner: Option<i64> = tx
            .query_row("SELECT owner FROM photos WHERE id = ?1", [photo], |row| row.get(0))
            .optional()?;
        let Some(owner) = owner else {
            return Ok(None);
        };
        tx.execute("DELETE FROM photos WHERE id = ?1", [photo])?;
        tx.commit()?;
        Ok(Some(ActivityEvent::photo_removed(UserId(owner), photo)))
    }
}

fn location_author(tx: &Transaction<'_>, location: EntityId) -> Result<UserId, StoreError> {
    tx.query_row("SELECT author FROM locations WHERE id = ?1", [location], |row| row.get(0))
        .optional()?
        .map(UserId)
        .ok_or(StoreError::NotFound { table: "locations", id: location })
}

fn review_author(tx: &Transaction<'_>, review: EntityId) -> Result<UserId, StoreError> {
    tx.query_row("SELECT author FROM reviews WHERE id = ?1", [review], |row| row.get(0))
        .optional()?
        .map(UserId)
        .ok_or(StoreError::NotFound { table: "reviews", id: review })
}

fn adjust_rating(tx: &Transaction<'_>, location: EntityId, sum_delta: i64, count_delta: i64) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE locations SET rating_sum = rating_sum + ?2, rating_count = rating_count + ?3 WHERE id = ?1",
        params![location, sum_delta, count_delta],
    )?;
    Ok(())
}

/// Delete one review and everything hanging off it, appending the removal
/// events: comments first, then the review itself.
fn delete_review(tx: &Transaction<'_>, review: EntityId, events: &mut Vec<ActivityEvent>) -> Result<(), StoreError> {
    let (author, location, rating): (i64, EntityId, i64) = tx
        .query_row(
            "SELECT author, location, rating FROM reviews WHERE id = ?1",
            [review],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?
        .ok_or(StoreError::NotFound { table: "reviews", id: review })?;
    let author = UserId(author);
    let location_author = location_author(tx, location)?;

    let commenters: Vec<i64> = tx
        .prepare("SELECT author FROM comments WHERE review = ?1 ORDER BY id")?
        .query_map([review], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    events.extend(
        commenters
            .into_iter()
            .map(|commenter| ActivityEvent::comment_removed(UserId(commenter), review, author)),
    );

    tx.execute("DELETE FROM comments WHERE review = ?1", [review])?;
    tx.execute("DELETE FROM votes WHERE review = ?1", [review])?;
    tx.execute("DELETE FROM reviews WHERE id = ?1", [review])?;
    if author != location_author {
        adjust_rating(tx, location, -rating, -1)?;
    }

    events.push(ActivityEvent::review_removed(author, location, location_author));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FactStore;

    #[test]
    fn removing_a_location_reports_every_cascaded_fact() {
        let store = SqliteStore::in_memory().unwrap();
        let (owner, visitor, commenter) = (UserId(1), UserId(2), UserId(3));
        let location = store.add_location(owner).unwrap().id;
        store.record_visit(visitor, location).unwrap();
        let review = store.add_review(visitor, location, 5).unwrap().id;
        store.add_comment(commenter, review).unwrap();

        let events = store.remove_location(location).unwrap();
        let kinds: Vec<(FactType, FactOutcome, UserId)> =
            events.iter().map(|e| (e.fact, e.outcome, e.user)).collect();
        assert_eq!(
            kinds,
            vec![
                (FactType::LocationAuthored, FactOutcome::Removed, owner),
                (FactType::Visit, FactOutcome::Removed, visitor),
                (FactType::Comment, FactOutcome::Removed, commenter),
                (FactType::Review, FactOutcome::Removed, visitor),
            ]
        );
        assert_eq!(store.reviews_written(visitor).unwrap(), 0);
        assert_eq!(store.comments_written(commenter).unwrap(), 0);
    }

    #[test]
    fn rating_edits_move_the_average() {
        let store = SqliteStore::in_memory().unwrap();
        let owner = UserId(1);
        let location = store.add_location(owner).unwrap().id;
        let review = store.add_review(UserId(2), location, 3).unwrap().id;
        assert_eq!(store.well_rated_locations(owner).unwrap(), 0);

        let event = store.update_review_rating(review, 4).unwrap();
        assert_eq!(event.related_owner, Some(owner));
        assert_eq!(store.well_rated_locations(owner).unwrap(), 1);

        store.remove_review(review).unwrap();
        assert_eq!(store.well_rated_locations(owner).unwrap(), 0);
    }

    #[test]
    fn repeat_writes_report_nothing() {
        let store = SqliteStore::in_memory().unwrap();
        let (a, b) = (UserId(1), UserId(2));
        assert!(store.follow(a, b).unwrap().is_some());
        assert!(store.follow(a, b).unwrap().is_none());
        assert!(store.unfollow(a, b).unwrap().is_some());
        assert!(store.unfollow(a, b).unwrap().is_none());
        assert!(store.remove_visit(a, 5).unwrap().is_none());
        assert!(store.remove_photo(123).unwrap().is_none());
    }

    #[test]
    fn second_vote_is_a_change() {
        let store = SqliteStore::in_memory().unwrap();
        let location = store.add_location(UserId(1)).unwrap().id;
        let review = store.add_review(UserId(2), location, 4).unwrap().id;
        assert_eq!(store.cast_vote(UserId(3), review, true).unwrap().outcome, FactOutcome::Created);
        assert_eq!(store.cast_vote(UserId(3), review, false).unwrap().outcome, FactOutcome::Changed);
    }

    #[test]
    fn missing_parent_rows_are_reported() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(matches!(
            store.add_review(UserId(1), 404, 5),
            Err(StoreError::NotFound { table: "locations", id: 404 })
        ));
        assert!(matches!(
            store.set_profile_completeness(UserId(1), 50),
            Err(StoreError::NotFound { table: "users", .. })
        ));
    }
}
