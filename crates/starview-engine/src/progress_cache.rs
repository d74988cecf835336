use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use starview_types::{ProgressSnapshot, UserId};

/// Cache epoch observed before computing a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

/// Per-user progress snapshots with a TTL plus explicit invalidation.
///
/// Every invalidation takes the next value of a cache-wide epoch and
/// records it for the user. A snapshot is stored only if no invalidation
/// for its user is newer than the epoch seen when computing began.
///
/// Expired entries are skipped on read and dropped by
/// [`purge_expired`](Self::purge_expired), which also forgets the
/// invalidation marks of users with no cached entry. A forgotten mark
/// reads as the epoch of the last purge, so a snapshot computed across a
/// purge is refused rather than risk a missed invalidation.
pub struct ProgressCache {
    ttl: Duration,
    entries: DashMap<UserId, (Arc<ProgressSnapshot>, Instant)>,
    invalidated: DashMap<UserId, u64>,
    epoch: AtomicU64,
    purged_at: AtomicU64,
}

impl ProgressCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            invalidated: DashMap::new(),
            epoch: AtomicU64::new(0),
            purged_at: AtomicU64::new(0),
        }
    }

    pub fn get(&self, user: UserId) -> Option<Arc<ProgressSnapshot>> {
        let entry = self.entries.get(&user)?;
        let (snapshot, expires_at) = entry.value();
        (Instant::now() < *expires_at).then(|| Arc::clone(snapshot))
    }

    /// Take before reading the state a snapshot is built from.
    pub fn generation(&self, _user: UserId) -> Generation {
        Generation(self.epoch.load(Ordering::SeqCst))
    }

    /// Store `snapshot` unless its user was invalidated after `seen`.
    /// Returns whether it was stored.
    pub fn put(&self, snapshot: Arc<ProgressSnapshot>, seen: Generation) -> bool {
        let Some(expires_at) = Instant::now().checked_add(self.ttl) else {
            return false;
        };
        // Held across the insert so a concurrent invalidation lands after it.
        let mark = self
            .invalidated
            .entry(snapshot.user)
            .or_insert_with(|| self.purged_at.load(Ordering::SeqCst));
        if *mark > seen.0 {
            return false;
        }
        self.entries.insert(snapshot.user, (snapshot, expires_at));
        true
    }

    pub fn invalidate(&self, user: UserId) {
        let mut mark = self.invalidated.entry(user).or_insert(0);
        *mark = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries.remove(&user);
    }

    /// Drop expired entries and the invalidation marks nothing depends on.
    /// Returns how many entries were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (_, expires_at)| now < *expires_at);

        let horizon = self.epoch.load(Ordering::SeqCst);
        self.purged_at.fetch_max(horizon, Ordering::SeqCst);
        self.invalidated
            .retain(|user, mark| *mark > horizon || self.entries.contains_key(user));

        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
