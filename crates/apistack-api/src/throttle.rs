//! Token-bucket throttling per (API key, method).
//!
//! A bucket starts full at `burstLimit` tokens and refills continuously at
//! `rateLimit` tokens per second. Each admitted request takes one token.

use std::collections::HashMap;
use std::time::Instant;

use apistack_core::model::ThrottleSettings;
use parking_lot::Mutex;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn full(settings: ThrottleSettings, now: Instant) -> Self {
        Self {
            tokens: f64::from(settings.burst_limit),
            last_refill: now,
        }
    }

    fn try_take(&mut self, settings: ThrottleSettings, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        let capacity = f64::from(settings.burst_limit);
        self.tokens = (self.tokens + elapsed * f64::from(settings.rate_limit)).min(capacity);
        self.last_refill = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Upper bound, in whole seconds, on how long an empty bucket takes to
/// refill one token. At least 1.
pub fn retry_after_secs(settings: ThrottleSettings) -> u64 {
    match settings.rate_limit {
        0 => 1,
        rate => (1.0 / f64::from(rate)).ceil().max(1.0) as u64,
    }
}

#[derive(Debug, Default)]
pub struct Throttler {
    buckets: Mutex<HashMap<(String, String), Bucket>>,
}

impl Throttler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit or refuse one request for `method_id` under `api_key`.
    pub fn try_acquire(&self, api_key: &str, method_id: &str, settings: ThrottleSettings) -> bool {
        self.try_acquire_at(api_key, method_id, settings, Instant::now())
    }

    pub fn try_acquire_at(
        &self,
        api_key: &str,
        method_id: &str,
        settings: ThrottleSettings,
        now: Instant,
    ) -> bool {
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry((api_key.to_string(), method_id.to_string()))
            .or_insert_with(|| Bucket::full(settings, now));
        let admitted = bucket.try_take(settings, now);
        if !admitted {
            tracing::debug!(method = method_id, "throttled");
        }
        admitted
    }

    pub fn tracked(&self) -> usize {
        self.buckets.lock().len()
    }
}
