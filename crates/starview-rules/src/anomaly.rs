use chrono::{DateTime, Duration, Utc};
use starview_types::{AnomalyFlag, UserId};

/// Visit burst detection: more than `threshold` visits inside `window`.
///
/// Flags are informational. The caller records them and carries on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurstPolicy {
    pub window: Duration,
    pub threshold: u64,
}

impl Default for BurstPolicy {
    fn default() -> Self {
        Self {
            window: Duration::hours(1),
            threshold: 10,
        }
    }
}

impl BurstPolicy {
    pub fn new(window: Duration, threshold: u64) -> Self {
        Self { window, threshold }
    }

    /// Inclusive lower bound of the window ending at `now`. A window reaching
    /// past the representable range starts at the earliest instant.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.window).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Compare a visit count taken over [`window_start`](Self::window_start)..=now.
    pub fn assess(&self, user: UserId, visits_in_window: u64, now: DateTime<Utc>) -> Option<AnomalyFlag> {
        (visits_in_window > self.threshold).then(|| AnomalyFlag {
            user,
            visits_in_window,
            threshold: self.threshold,
            window_secs: self.window.num_seconds().max(0) as u64,
            flagged_at: now,
        })
    }
}
