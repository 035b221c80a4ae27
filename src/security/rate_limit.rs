//! Login attempt limiting.
//!
//! Two token buckets guard the login form: a short one (2 per minute) and a
//! long one (12 per hour). An attempt needs a token from both.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, per: Duration, now: Instant) -> Self {
        Self {
            capacity: capacity as f64,
            refill_per_sec: capacity as f64 / per.as_secs_f64(),
            tokens: capacity as f64,
            last_update: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_update = now;
    }
}

/// Rate limiter for password attempts. Global, not per client.
#[derive(Debug)]
pub struct LoginRateLimiter {
    buckets: Mutex<[TokenBucket; 2]>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            buckets: Mutex::new([
                TokenBucket::new(2, Duration::from_secs(60), now),
                TokenBucket::new(12, Duration::from_secs(60 * 60), now),
            ]),
        }
    }

    /// Take one attempt. Returns false when either bucket is empty.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().expect("login limiter mutex poisoned");
        for bucket in buckets.iter_mut() {
            bucket.refill(now);
        }
        if buckets.iter().any(|b| b.tokens < 1.0) {
            return false;
        }
        for bucket in buckets.iter_mut() {
            bucket.tokens -= 1.0;
        }
        true
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
