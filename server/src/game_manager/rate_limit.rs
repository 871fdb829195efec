use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_reset_at: Instant,
}

/// Fixed-window request throttle keyed by identity.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    entries: DashMap<String, RateLimitEntry>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            entries: DashMap::new(),
        }
    }

    pub fn check_request(&self, identity_id: &str) -> bool {
        self.check_request_at(identity_id, Instant::now())
    }

    pub fn check_request_at(&self, identity_id: &str, now: Instant) -> bool {
        let mut entry = self
            .entries
            .entry(identity_id.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                window_reset_at: now + self.window,
            });

        if now > entry.window_reset_at || entry.count == 0 {
            entry.count = 1;
            entry.window_reset_at = now + self.window;
            return true;
        }

        if entry.count >= self.max_requests {
            tracing::warn!(identity_id = %identity_id, count = entry.count, "Rate limit exceeded");
            return false;
        }

        entry.count += 1;
        true
    }

    /// Drops entries whose window has elapsed. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.window_reset_at);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(10, Duration::from_secs(60))
    }

    #[test]
    fn allows_ten_then_denies_within_window() {
        let limiter = limiter();
        let now = Instant::now();
        for _ in 0..10 {
            assert!(limiter.check_request_at("u1", now));
        }
        assert!(!limiter.check_request_at("u1", now + Duration::from_secs(1)));
        assert!(!limiter.check_request_at("u1", now + Duration::from_secs(59)));
        assert_eq!(limiter.entries.get("u1").map(|e| e.count), Some(10));
    }

    #[test]
    fn window_elapse_resets_counter() {
        let limiter = limiter();
        let now = Instant::now();
        for _ in 0..11 {
            limiter.check_request_at("u1", now);
        }
        let later = now + Duration::from_secs(61);
        assert!(limiter.check_request_at("u1", later));
        assert_eq!(limiter.entries.get("u1").map(|e| e.count), Some(1));
    }

    #[test]
    fn identities_are_limited_independently() {
        let limiter = limiter();
        let now = Instant::now();
        for _ in 0..10 {
            limiter.check_request_at("u1", now);
        }
        assert!(!limiter.check_request_at("u1", now));
        assert!(limiter.check_request_at("u2", now));
    }

    #[test]
    fn sweep_removes_only_expired_windows() {
        let limiter = limiter();
        let now = Instant::now();
        limiter.check_request_at("old", now);
        limiter.check_request_at("fresh", now + Duration::from_secs(30));

        assert_eq!(limiter.sweep(now + Duration::from_secs(61)), 1);
        assert_eq!(limiter.len(), 1);
        assert!(limiter.entries.contains_key("fresh"));
    }
}
