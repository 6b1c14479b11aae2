//! Continuous-refill token bucket, the rate-limiting primitive shared by the
//! chain-level admission queue and every individual endpoint.
//!
//! Refill is computed lazily from elapsed wall-clock time at the moment of
//! access; there is no background timer. All read-modify-write steps happen
//! under one synchronous lock acquisition so a check never races its mutate.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Capacity and refill rate for a [`RateBucket`].
///
/// Produced by the layered configuration resolution in
/// [`crate::config::Settings`]; both values are guaranteed positive there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketConfig {
    /// Maximum burst size, in tokens. Must be greater than zero.
    pub capacity: f64,
    /// Refill rate in tokens per second. Must be greater than zero.
    pub refill_per_sec: f64,
}

/// Point-in-time view of a bucket's state.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BucketSnapshot {
    pub tokens: f64,
    pub capacity: f64,
    pub refill_per_sec: f64,
    /// Share of the burst capacity currently spent, in percent.
    pub utilization_pct: f64,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with fractional tokens and continuous refill.
///
/// Capacity and refill rate are fixed at construction. Tokens never exceed
/// capacity and never go negative; the monotonic clock guarantees elapsed
/// time is non-negative, so a clock anomaly can never drain the bucket.
#[derive(Debug)]
pub struct RateBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl RateBucket {
    /// Creates a full bucket from a resolved configuration.
    #[must_use]
    pub fn new(config: BucketConfig) -> Self {
        debug_assert!(config.capacity > 0.0, "bucket capacity must be positive");
        debug_assert!(config.refill_per_sec > 0.0, "bucket refill rate must be positive");
        Self {
            capacity: config.capacity,
            refill_per_sec: config.refill_per_sec,
            state: Mutex::new(BucketState { tokens: config.capacity, last_refill: Instant::now() }),
        }
    }

    /// Adds tokens for the time elapsed since the last refill, capped at
    /// capacity. Must be called with the state lock held.
    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        if !elapsed.is_zero() {
            state.tokens =
                (state.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);
            state.last_refill = now;
        }
    }

    /// Attempts to take one token without blocking.
    ///
    /// Refills lazily, then consumes a token if at least one whole token is
    /// available. Returns `false` and leaves the state otherwise unchanged
    /// when the bucket is below one token.
    pub fn try_consume(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Takes one token, sleeping until the refill makes one available.
    ///
    /// Returns the total time slept, which is zero when a token was
    /// immediately available and otherwise matches the deficit divided by
    /// the refill rate. Each check-and-consume is a single locked step and
    /// the sleep happens outside the lock, so concurrent waiters re-check
    /// after sleeping rather than driving the balance negative.
    pub async fn wait_for_token(&self) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            let deficit_wait = {
                let mut state = self.state.lock();
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return waited;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_sec)
            };
            tokio::time::sleep(deficit_wait).await;
            waited += deficit_wait;
        }
    }

    /// Returns a snapshot of the current state after a lazy refill.
    #[must_use]
    pub fn snapshot(&self) -> BucketSnapshot {
        let mut state = self.state.lock();
        self.refill(&mut state);
        BucketSnapshot {
            tokens: state.tokens,
            capacity: self.capacity,
            refill_per_sec: self.refill_per_sec,
            utilization_pct: (self.capacity - state.tokens) / self.capacity * 100.0,
        }
    }

    /// Refills the bucket to capacity and resets the refill clock.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.tokens = self.capacity;
        state.last_refill = Instant::now();
    }

    #[must_use]
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    #[must_use]
    pub fn refill_per_sec(&self) -> f64 {
        self.refill_per_sec
    }
}
