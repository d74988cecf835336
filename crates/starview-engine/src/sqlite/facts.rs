use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use starview_types::{EntityId, HelpfulRatio, UserId};

use super::{SqliteStore, millis, to_count};
use crate::error::StoreError;
use crate::store::FactStore;

impl FactStore for SqliteStore {
    fn location_visits(&self, user: UserId) -> Result<u64, StoreError> {
        self.count("visits", "SELECT COUNT(*) FROM visits WHERE user = ?1", [user.0])
    }

    fn locations_added(&self, user: UserId) -> Result<u64, StoreError> {
        self.count("locations", "SELECT COUNT(*) FROM locations WHERE author = ?1", [user.0])
    }

    fn well_rated_locations(&self, user: UserId) -> Result<u64, StoreError> {
        // average >= 4.0 without division: sum >= 4 * count
        self.count(
            "locations",
            "SELECT COUNT(*) FROM locations
             WHERE author = ?1 AND rating_count > 0 AND rating_sum >= 4 * rating_count",
            [user.0],
        )
    }

    fn reviews_written(&self, user: UserId) -> Result<u64, StoreError> {
        self.count("reviews", "SELECT COUNT(*) FROM reviews WHERE author = ?1", [user.0])
    }

    fn upvotes_received(&self, user: UserId) -> Result<u64, StoreError> {
        self.count(
            "votes",
            "SELECT COUNT(*) FROM votes v JOIN reviews r ON r.id = v.review
             WHERE r.author = ?1 AND v.voter <> r.author AND v.helpful = 1",
            [user.0],
        )
    }

    fn helpful_votes(&self, user: UserId) -> Result<HelpfulRatio, StoreError> {
        let conn = self.conn.lock();
        let (upvotes, total): (i64, i64) = conn
            .prepare_cached(
                "SELECT COALESCE(SUM(v.helpful), 0), COUNT(*)
                 FROM votes v JOIN reviews r ON r.id = v.review
                 WHERE r.author = ?1 AND v.voter <> r.author",
            )?
            .query_row([user.0], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(HelpfulRatio::new(to_count("votes", upvotes)?, to_count("votes", total)?))
    }

    fn comments_written(&self, user: UserId) -> Result<u64, StoreError> {
        self.count(
            "comments",
            "SELECT COUNT(*) FROM comments c JOIN reviews r ON r.id = c.review
             WHERE c.author = ?1 AND r.author <> c.author",
            [user.0],
        )
    }

    fn follower_count(&self, user: UserId) -> Result<u64, StoreError> {
        self.count("follows", "SELECT COUNT(*) FROM follows WHERE followed = ?1", [user.0])
    }

    fn photos_uploaded(&self, user: UserId) -> Result<u64, StoreError> {
        self.count("photos", "SELECT COUNT(*) FROM photos WHERE owner = ?1", [user.0])
    }

    fn tenure_rank(&self, user: UserId) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let rank: Option<i64> = conn
            .prepare_cached("SELECT registration_rank FROM users WHERE id = ?1")?
            .query_row([user.0], |row| row.get(0))
            .optional()?;
        rank.map_or(Ok(0), |rank| to_count("users", rank))
    }

    fn profile_completeness(&self, user: UserId) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let percent: Option<i64> = conn
            .prepare_cached("SELECT profile_completeness FROM users WHERE id = ?1")?
            .query_row([user.0], |row| row.get(0))
            .optional()?;
        percent.map_or(Ok(0), |percent| to_count("users", percent))
    }

    fn visits_since(&self, user: UserId, since: DateTime<Utc>) -> Result<u64, StoreError> {
        self.count(
            "visits",
            "SELECT COUNT(*) FROM visits WHERE user = ?1 AND visited_at >= ?2",
            params![user.0, millis(since)],
        )
    }

    fn mark_visited(&self, user: UserId, location: EntityId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let inserted = conn
            .prepare_cached(
                "INSERT INTO visits (user, location, visited_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user, location) DO NOTHING",
            )?
            .execute(params![user.0, location, millis(at)])?;
        Ok(inserted == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    #[test]
    fn self_reviews_do_not_move_location_average() {
        let store = store();
        let (author, other) = (UserId(1), UserId(2));
        let location = store.add_location(author).unwrap().id;

        store.add_review(author, location, 1).unwrap();
        assert_eq!(store.well_rated_locations(author).unwrap(), 0);

        store.add_review(other, location, 4).unwrap();
        assert_eq!(store.well_rated_locations(author).unwrap(), 1);
    }

    #[test]
    fn exactly_four_stars_qualifies() {
        let store = store();
        let author = UserId(1);
        let location = store.add_location(author).unwrap().id;
        store.add_review(UserId(2), location, 5).unwrap();
        store.add_review(UserId(3), location, 3).unwrap();
        assert_eq!(store.well_rated_locations(author).unwrap(), 1);

        store.add_review(UserId(4), location, 3).unwrap();
        assert_eq!(store.well_rated_locations(author).unwrap(), 0);
    }

    #[test]
    fn comments_on_own_reviews_are_not_counted() {
        let store = store();
        let (alice, bob) = (UserId(1), UserId(2));
        let location = store.add_location(bob).unwrap().id;
        let own = store.add_review(alice, location, 5).unwrap().id;
        let theirs = store.add_review(bob, location, 5).unwrap().id;

        store.add_comment(alice, own).unwrap();
        assert_eq!(store.comments_written(alice).unwrap(), 0);
        store.add_comment(alice, theirs).unwrap();
        assert_eq!(store.comments_written(alice).unwrap(), 1);
    }

    #[test]
    fn self_votes_are_ignored_in_both_vote_aggregates() {
        let store = store();
        let (alice, bob) = (UserId(1), UserId(2));
        let location = store.add_location(bob).unwrap().id;
        let review = store.add_review(alice, location, 4).unwrap().id;

        store.cast_vote(alice, review, true).unwrap();
        assert_eq!(store.upvotes_received(alice).unwrap(), 0);
        assert_eq!(store.helpful_votes(alice).unwrap(), HelpfulRatio::new(0, 0));

        store.cast_vote(bob, review, false).unwrap();
        assert_eq!(store.helpful_votes(alice).unwrap(), HelpfulRatio::new(0, 1));
        store.cast_vote(bob, review, true).unwrap();
        assert_eq!(store.upvotes_received(alice).unwrap(), 1);
        assert_eq!(store.helpful_votes(alice).unwrap(), HelpfulRatio::new(1, 1));
    }

    #[test]
    fn tenure_rank_follows_registration_order() {
        let store = store();
        store.register_user(UserId(40)).unwrap();
        store.register_user(UserId(7)).unwrap();
        assert_eq!(store.tenure_rank(UserId(40)).unwrap(), 1);
        assert_eq!(store.tenure_rank(UserId(7)).unwrap(), 2);
        assert_eq!(store.tenure_rank(UserId(99)).unwrap(), 0);
    }

    #[test]
    fn deleted_users_keep_their_rank_out_of_circulation() {
        let store = store();
        store.register_user(UserId(1)).unwrap();
        store.register_user(UserId(2)).unwrap();
        store.delete_user(UserId(2)).unwrap();
        assert_eq!(store.tenure_rank(UserId(2)).unwrap(), 0);

        store.register_user(UserId(3)).unwrap();
        assert_eq!(store.tenure_rank(UserId(3)).unwrap(), 3);

        // A duplicate registration fails without consuming a rank.
        assert!(store.register_user(UserId(3)).is_err());
        store.register_user(UserId(4)).unwrap();
        assert_eq!(store.tenure_rank(UserId(4)).unwrap(), 4);
    }

    #[test]
    fn mark_visited_inserts_once() {
        let store = store();
        let now = Utc::now();
        assert!(store.mark_visited(UserId(1), 10, now).unwrap());
        assert!(!store.mark_visited(UserId(1), 10, now).unwrap());
        assert_eq!(store.location_visits(UserId(1)).unwrap(), 1);
        assert_eq!(store.visits_since(UserId(1), now).unwrap(), 1);
        assert_eq!(store.visits_since(UserId(1), now + chrono::Duration::seconds(1)).unwrap(), 0);
    }
}
