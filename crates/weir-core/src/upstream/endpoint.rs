//! A single upstream RPC endpoint: its URL, its own rate bucket, and rolling
//! success/failure counters feeding the selection heuristic.
//!
//! # Lock-Free Counters
//!
//! Counters use atomics so attempt bookkeeping never contends with the
//! bucket lock. The last-used timestamp is stored as nanoseconds elapsed
//! since a per-endpoint epoch `Instant` in an `AtomicU64` (0 = never used);
//! nanoseconds only overflow u64 after ~584 years of uptime.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use serde::Serialize;

use crate::throttle::bucket::{BucketConfig, RateBucket};

/// Immutable per-endpoint view handed to the selector.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointSnapshot {
    pub url: Arc<str>,
    pub tokens: f64,
    pub capacity: f64,
    pub utilization_pct: f64,
    pub failure_count: u64,
    pub success_count: u64,
    pub total_requests: u64,
    /// Time since the endpoint last started an attempt (time since creation
    /// when it has never been used).
    pub idle: Duration,
}

impl EndpointSnapshot {
    /// Historical failure rate, zero when no requests have been made.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.failure_count as f64 / self.total_requests as f64
    }
}

/// One upstream endpoint within a chain's set.
pub struct Endpoint {
    url: Arc<str>,
    bucket: RateBucket,
    failure_count: AtomicU64,
    success_count: AtomicU64,
    total_requests: AtomicU64,
    /// Nanoseconds since `epoch` when the last attempt started (0 = never).
    last_used_nanos: AtomicU64,
    epoch: Instant,
}

impl Endpoint {
    #[must_use]
    pub fn new(url: impl Into<Arc<str>>, bucket_config: BucketConfig) -> Self {
        Self {
            url: url.into(),
            bucket: RateBucket::new(bucket_config),
            failure_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            last_used_nanos: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn now_nanos(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Shared handle to the URL for building connection specs.
    #[must_use]
    pub fn url_arc(&self) -> Arc<str> {
        Arc::clone(&self.url)
    }

    #[must_use]
    pub fn bucket(&self) -> &RateBucket {
        &self.bucket
    }

    /// Records the start of an attempt: bumps the request total and stamps
    /// the last-used clock.
    pub fn begin_attempt(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.last_used_nanos.store(self.now_nanos().max(1), Ordering::Relaxed);
    }

    /// Records a successful attempt.
    pub fn record_success(&self) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed attempt.
    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Clears the failure counter (chain-wide reset on any success).
    pub fn reset_failures(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
    }

    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Time since the last attempt started, or since creation if unused.
    #[must_use]
    pub fn idle(&self) -> Duration {
        let last = self.last_used_nanos.load(Ordering::Relaxed);
        if last == 0 {
            return self.epoch.elapsed();
        }
        Duration::from_nanos(self.now_nanos().saturating_sub(last))
    }

    /// Captures the state the selector scores against.
    #[must_use]
    pub fn snapshot(&self) -> EndpointSnapshot {
        let bucket = self.bucket.snapshot();
        EndpointSnapshot {
            url: Arc::clone(&self.url),
            tokens: bucket.tokens,
            capacity: bucket.capacity,
            utilization_pct: bucket.utilization_pct,
            failure_count: self.failure_count(),
            success_count: self.success_count(),
            total_requests: self.total_requests(),
            idle: self.idle(),
        }
    }
}
