// Request rate limiting for the moderation endpoint.
//
// The port is a single `allow(key)` call so the http layer does not care
// whether windows live in memory or in a shared cache.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Run a sweep of expired windows every this many `allow` calls.
const SWEEP_EVERY: u64 = 1_000;

/// Decides whether a caller identified by `key` may proceed.
pub trait RateLimiter: Send + Sync {
    fn allow(&self, key: &str) -> bool;
}

/// Fixed window state for one key.
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// In-memory fixed-window limiter.
///
/// Each key may make `max_requests` calls per `window`. Expired windows are
/// evicted by `sweep_expired`, which also runs every `SWEEP_EVERY` calls so the
/// map cannot grow without bound.
pub struct InMemoryRateLimiter {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
    calls: AtomicU64,
}

impl InMemoryRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: DashMap::new(),
            calls: AtomicU64::new(0),
        }
    }

    /// Check a key at an explicit instant.
    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if calls % SWEEP_EVERY == 0 {
            self.sweep_expired_at(now);
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Drop every window that has already expired. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    fn sweep_expired_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.duration_since(w.started) < self.window);
        before.saturating_sub(self.windows.len())
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }
}
