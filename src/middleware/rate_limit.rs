use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Fixed-window request counter keyed by workspace
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, (Instant, u32)>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            limit,
            window: Duration::from_secs(window_secs.max(1)),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request against `key`. False once the window is full.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        // Keep the map from growing without bound
        if windows.len() > 16_384 {
            let window = self.window;
            windows.retain(|_, (started, _)| now.duration_since(*started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        if entry.1 >= self.limit {
            return false;
        }
        entry.1 += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_limit_until_window_rolls() {
        let limiter = RateLimiter::new(2, 60);
        let start = Instant::now();

        assert!(limiter.allow_at("ws", start));
        assert!(limiter.allow_at("ws", start));
        assert!(!limiter.allow_at("ws", start));
        assert!(limiter.allow_at("other", start));

        assert!(limiter.allow_at("ws", start + Duration::from_secs(61)));
    }
}
