use std::time::Duration;

use serde::Deserialize;
use starview_rules::BurstPolicy;

/// Most badges a user may pin to their profile.
pub const MAX_PINNED_BADGES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    progress_ttl_secs: u64,
    anomaly_window_secs: u64,
    anomaly_burst_threshold: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_ttl_secs: 300,
            anomaly_window_secs: 3600,
            anomaly_burst_threshold: 10,
        }
    }
}

impl EngineConfig {
    /// Lifetime of a cached progress snapshot. Zero disables caching.
    pub fn progress_ttl(mut self, ttl: Duration) -> Self {
        self.progress_ttl_secs = ttl.as_secs();
        self
    }

    pub fn anomaly_window(mut self, window: Duration) -> Self {
        self.anomaly_window_secs = window.as_secs();
        self
    }

    /// Visits in the window above this count raise a flag.
    pub fn anomaly_burst_threshold(mut self, threshold: u64) -> Self {
        self.anomaly_burst_threshold = threshold;
        self
    }

    pub fn progress_ttl_duration(&self) -> Duration {
        Duration::from_secs(self.progress_ttl_secs)
    }

    pub fn burst_policy(&self) -> BurstPolicy {
        let window = i64::try_from(self.anomaly_window_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX);
        BurstPolicy::new(window, self.anomaly_burst_threshold)
    }
}
