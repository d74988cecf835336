use rusqlite::Connection;

/// Timestamps are unix milliseconds. Quality aggregates are kept on the
/// location row (`rating_sum`, `rating_count`) and exclude the author's own
/// reviews.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    registration_rank INTEGER NOT NULL UNIQUE,
    profile_completeness INTEGER NOT NULL DEFAULT 0
        CHECK (profile_completeness BETWEEN 0 AND 100),
    joined_at INTEGER NOT NULL
);

-- Append-only. AUTOINCREMENT keeps a deleted user's rank from being handed out again.
CREATE TABLE IF NOT EXISTS registrations (
    rank INTEGER PRIMARY KEY AUTOINCREMENT,
    user INTEGER NOT NULL,
    registered_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    author INTEGER NOT NULL,
    rating_sum INTEGER NOT NULL DEFAULT 0,
    rating_count INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_locations_author ON locations(author);

CREATE TABLE IF NOT EXISTS visits (
    user INTEGER NOT NULL,
    location INTEGER NOT NULL,
    visited_at INTEGER NOT NULL,
    PRIMARY KEY (user, location)
);
CREATE INDEX IF NOT EXISTS idx_visits_user_time ON visits(user, visited_at);
CREATE INDEX IF NOT EXISTS idx_visits_location ON visits(location);

CREATE TABLE IF NOT EXISTS reviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    author INTEGER NOT NULL,
    location INTEGER NOT NULL,
    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    UNIQUE (author, location)
);
CREATE INDEX IF NOT EXISTS idx_reviews_location ON reviews(location);

CREATE TABLE IF NOT EXISTS votes (
    voter INTEGER NOT NULL,
    review INTEGER NOT NULL,
    helpful INTEGER NOT NULL CHECK (helpful IN (0, 1)),
    PRIMARY KEY (voter, review)
);
CREATE INDEX IF NOT EXISTS idx_votes_review ON votes(review);

CREATE TABLE IF NOT EXISTS follows (
    follower INTEGER NOT NULL,
    followed INTEGER NOT NULL,
    PRIMARY KEY (follower, followed),
    CHECK (follower <> followed)
);
CREATE INDEX IF NOT EXISTS idx_follows_followed ON follows(followed);

CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    author INTEGER NOT NULL,
    review INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_comments_author ON comments(author);
CREATE INDEX IF NOT EXISTS idx_comments_review ON comments(review);

CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_photos_owner ON photos(owner);

CREATE TABLE IF NOT EXISTS badge_definitions (
    slug TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL,
    criteria_type TEXT NOT NULL,
    criteria_value INTEGER NOT NULL,
    criteria_secondary INTEGER,
    tier INTEGER NOT NULL,
    revocable INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS activity_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fact TEXT NOT NULL,
    outcome TEXT NOT NULL,
    user INTEGER NOT NULL,
    related INTEGER NOT NULL,
    related_owner INTEGER,
    occurred_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS achievements (
    user INTEGER NOT NULL,
    badge TEXT NOT NULL,
    earned_at INTEGER NOT NULL,
    event INTEGER NOT NULL,
    PRIMARY KEY (user, badge)
);
CREATE INDEX IF NOT EXISTS idx_achievements_user_event ON achievements(user, event);

CREATE TABLE IF NOT EXISTS pinned_badges (
    user INTEGER NOT NULL,
    badge TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (user, badge)
);

CREATE TABLE IF NOT EXISTS anomaly_flags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user INTEGER NOT NULL,
    visits_in_window INTEGER NOT NULL,
    threshold INTEGER NOT NULL,
    window_secs INTEGER NOT NULL,
    flagged_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_anomaly_flags_user ON anomaly_flags(user);
";

pub(super) fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
