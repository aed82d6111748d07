//! Per-client failure tracking with escalating response delay.
//!
//! Each client key owns a sliding window of failure timestamps. A failure
//! yields a delay of `min(base * failures_in_window, cap)` that the caller
//! waits out before answering. Correct credentials are never locked out
//! unless a hard threshold is configured.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Tunables for the abuse guard.
#[derive(Debug, Clone)]
pub struct GuardPolicy {
    /// Failures older than this are forgotten
    pub window: Duration,
    /// Delay per recent failure
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Hard denial once a client has this many recent failures
    pub max_attempts: Option<usize>,
    /// Soft cap on tracked client keys
    pub max_tracked: usize,
}

impl GuardPolicy {
    /// Delay for a client with `attempts` failures inside the window.
    pub fn delay_for(&self, attempts: usize) -> Duration {
        let factor = u32::try_from(attempts).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Table size to shrink to when a new client arrives at capacity.
    ///
    /// Eviction drops roughly a tenth of `max_tracked` (at least one key).
    pub fn eviction_target(&self) -> usize {
        let batch = (self.max_tracked / 10).max(1);
        self.max_tracked.saturating_sub(batch)
    }
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            max_attempts: None,
            max_tracked: 100_000,
        }
    }
}

/// Outcome of recording a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Penalty {
    pub attempts: usize,
    pub delay: Duration,
}

/// Sliding-window failure table keyed by client.
///
/// Per-key updates run under the map's shard lock, so prune+append and
/// removal are atomic for a key without serializing the whole table.
pub struct AbuseGuard {
    windows: DashMap<String, Vec<Instant>>,
    policy: GuardPolicy,
}

impl AbuseGuard {
    pub fn new(policy: GuardPolicy) -> Self {
        Self {
            windows: DashMap::new(),
            policy,
        }
    }

    /// Record a failure for `key` and return the delay to apply.
    pub fn penalize(&self, key: &str) -> Penalty {
        let now = Instant::now();
        if !self.windows.contains_key(key) {
            self.make_room(now);
        }

        let attempts = {
            let mut times = self.windows.entry(key.to_string()).or_default();
            times.retain(|&t| now.duration_since(t) < self.policy.window);
            times.push(now);
            times.len()
        };

        Penalty {
            attempts,
            delay: self.policy.delay_for(attempts),
        }
    }

    /// Forget all failures for `key`.
    pub fn clear(&self, key: &str) {
        self.windows.remove(key);
    }

    /// Failures for `key` still inside the window. Does not prune.
    pub fn recent_failures(&self, key: &str) -> usize {
        let now = Instant::now();
        self.windows
            .get(key)
            .map(|times| {
                times
                    .iter()
                    .filter(|&&t| now.duration_since(t) < self.policy.window)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Whether `key` has reached the configured hard threshold.
    pub fn is_blocked(&self, key: &str) -> bool {
        match self.policy.max_attempts {
            Some(max) => self.recent_failures(key) >= max,
            None => false,
        }
    }

    /// Drop keys whose failures have all left the window. Returns the number
    /// of keys removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        let window = self.policy.window;
        self.windows.retain(|_, times| {
            times.retain(|&t| now.duration_since(t) < window);
            !times.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of client keys currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    // At capacity, shrink to eviction_target: stale keys first, then the
    // oldest last failures. Concurrent inserts may briefly overshoot max_tracked.
    fn make_room(&self, now: Instant) {
        if self.windows.len() < self.policy.max_tracked {
            return;
        }

        let swept = self.sweep_at(now);
        if swept > 0 {
            tracing::debug!(swept, "Swept stale client windows");
        }

        let target = self.policy.eviction_target();
        if self.windows.len() <= target {
            return;
        }

        let mut by_age: Vec<(Option<Instant>, String)> = self
            .windows
            .iter()
            .map(|entry| (entry.value().last().copied(), entry.key().clone()))
            .collect();
        let excess = by_age.len().saturating_sub(target);
        if excess == 0 {
            return;
        }
        by_age.select_nth_unstable_by_key(excess - 1, |(last, _)| *last);

        for (_, key) in by_age.into_iter().take(excess) {
            self.windows.remove(&key);
        }
        tracing::debug!(evicted = excess, "Evicted oldest client windows at capacity");
    }
}
