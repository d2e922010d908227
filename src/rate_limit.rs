use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Maximum login attempts per client within [`LOGIN_WINDOW`].
pub const LOGIN_MAX_ATTEMPTS: u64 = 5;
pub const LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);

/// In-memory sliding-window limiter keyed by an arbitrary string
/// such as `"login:<ip>"`.
pub struct RateLimiter {
    entries: Mutex<HashMap<String, Vec<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        RateLimiter {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record an attempt and return true if it is still under the limit.
    pub fn check_and_record(&self, key: &str, max_attempts: u64, window: Duration) -> bool {
        let mut map = self.entries();
        let now = Instant::now();

        let attempts = map.entry(key.to_string()).or_default();
        attempts.retain(|t| now.duration_since(*t) < window);

        if (attempts.len() as u64) < max_attempts {
            attempts.push(now);
            true
        } else {
            false
        }
    }

    /// Forget a key, e.g. after a successful login.
    pub fn reset(&self, key: &str) {
        self.entries().remove(key);
    }

    /// Drop entries with no attempt younger than `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries().retain(|_, attempts| {
            attempts.retain(|t| now.duration_since(*t) < max_age);
            !attempts.is_empty()
        });
    }
}
