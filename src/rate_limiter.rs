use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Returned when a key has used up its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limit exceeded, retry in {}s", retry_after.as_secs())]
pub struct RateLimited {
    pub retry_after: Duration,
}

/// Counter for one key within the current window.
#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

impl WindowState {
    fn fresh(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn is_expired(&self, window: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }
}

/// Fixed-window limiter keyed by an arbitrary string (the client address).
///
/// Each key's check-and-increment runs under that key's shard lock, so two
/// concurrent callers can never both take the last slot. Distinct keys only
/// contend when they hash to the same shard.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<String, WindowState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit one attempt for `key` if fewer than `limit` were admitted in the
    /// current window.
    pub fn check_and_record(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<(), RateLimited> {
        self.check_and_record_at(key, limit, window, Instant::now())
    }

    pub fn check_and_record_at(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now: Instant,
    ) -> Result<(), RateLimited> {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| WindowState::fresh(now));

        if entry.is_expired(window, now) {
            *entry = WindowState::fresh(now);
        }

        if entry.count < limit {
            entry.count += 1;
            return Ok(());
        }

        let elapsed = now.saturating_duration_since(entry.window_start);
        Err(RateLimited {
            retry_after: window.saturating_sub(elapsed),
        })
    }

    /// Attempts left for `key` in its current window.
    pub fn remaining(&self, key: &str, limit: u32, window: Duration) -> u32 {
        let now = Instant::now();
        match self.windows.get(key) {
            Some(state) if !state.is_expired(window, now) => limit.saturating_sub(state.count),
            _ => limit,
        }
    }

    /// Forget everything recorded for `key`.
    pub fn reset(&self, key: &str) {
        self.windows.remove(key);
    }

    /// Drop keys whose window has elapsed; returns how many were removed.
    pub fn purge_expired(&self, window: Duration) -> usize {
        self.purge_expired_at(window, Instant::now())
    }

    pub fn purge_expired_at(&self, window: Duration, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, state| !state.is_expired(window, now));
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
