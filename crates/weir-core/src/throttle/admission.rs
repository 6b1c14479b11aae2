//! Bounded-concurrency admission with FIFO overflow, one queue per chain.
//!
//! A queue admits up to `max_concurrent` callers at once; everyone else parks
//! in arrival order on a oneshot wake. Releasing a slot and waking the queue
//! head happen inside a single lock acquisition, so the invariant
//! `active <= max_concurrent` holds at every instant.
//!
//! The pending list is deliberately unbounded: sustained overload grows it
//! and a depth past the configured threshold only logs a warning. Queued
//! callers cannot be withdrawn once enqueued.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::{
    throttle::bucket::{BucketConfig, RateBucket},
    types::ChainId,
};

/// Point-in-time admission counters for one chain.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AdmissionStats {
    /// Calls currently holding a slot.
    pub active: usize,
    /// Calls parked in the FIFO overflow queue.
    pub pending: usize,
    /// Concurrency cap.
    pub max_concurrent: usize,
}

struct QueueInner {
    active: usize,
    pending: VecDeque<oneshot::Sender<()>>,
}

/// Per-chain admission queue bounding concurrently in-flight calls.
///
/// Owns the chain-level [`RateBucket`]; admitted callers wait on it before
/// starting work. Created lazily by the registry and lives for the process
/// lifetime.
pub struct AdmissionQueue {
    chain: ChainId,
    max_concurrent: usize,
    queue_warn_depth: usize,
    bucket: RateBucket,
    inner: Mutex<QueueInner>,
}

impl AdmissionQueue {
    /// Creates an empty queue with the resolved cap and chain bucket.
    #[must_use]
    pub fn new(
        chain: ChainId,
        max_concurrent: usize,
        bucket_config: BucketConfig,
        queue_warn_depth: usize,
    ) -> Self {
        debug_assert!(max_concurrent > 0, "admission cap must be positive");
        Self {
            chain,
            max_concurrent,
            queue_warn_depth,
            bucket: RateBucket::new(bucket_config),
            inner: Mutex::new(QueueInner { active: 0, pending: VecDeque::new() }),
        }
    }

    /// Acquires an admission slot, parking FIFO when the chain is saturated.
    ///
    /// The returned permit releases the slot on drop, on the success and
    /// failure paths alike. There is no way to abandon a queued acquisition;
    /// a parked caller runs when its turn comes.
    pub async fn acquire(&self) -> AdmissionPermit<'_> {
        let waiter = {
            let mut inner = self.inner.lock();
            if inner.active < self.max_concurrent {
                inner.active += 1;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                inner.pending.push_back(tx);
                let depth = inner.pending.len();
                if depth >= self.queue_warn_depth {
                    warn!(
                        chain = %self.chain,
                        depth,
                        threshold = self.queue_warn_depth,
                        "admission queue depth past threshold"
                    );
                }
                Some((rx, depth))
            }
        };

        if let Some((rx, depth)) = waiter {
            debug!(chain = %self.chain, depth, "chain saturated, queued for admission");
            // The sender side is only dropped if the queue itself is torn
            // down, which cannot happen while the caller borrows it; a wake
            // carries an already-counted slot.
            let _ = rx.await;
        }

        AdmissionPermit { queue: self }
    }

    /// Releases one slot and hands it to the queue head, if any.
    ///
    /// Decrement and conditional dequeue form one locked step. A waiter
    /// whose receiving future has already been dropped is skipped and its
    /// slot reclaimed within the same step.
    fn release(&self) {
        let mut inner = self.inner.lock();
        inner.active -= 1;
        while inner.active < self.max_concurrent {
            let Some(next) = inner.pending.pop_front() else { break };
            inner.active += 1;
            if next.send(()).is_ok() {
                break;
            }
            inner.active -= 1;
        }
    }

    /// The chain-level rate bucket shared by every admitted call.
    #[must_use]
    pub fn bucket(&self) -> &RateBucket {
        &self.bucket
    }

    #[must_use]
    pub fn chain(&self) -> &ChainId {
        &self.chain
    }

    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Returns the current admission counters.
    #[must_use]
    pub fn stats(&self) -> AdmissionStats {
        let inner = self.inner.lock();
        AdmissionStats {
            active: inner.active,
            pending: inner.pending.len(),
            max_concurrent: self.max_concurrent,
        }
    }
}

/// RAII admission slot; dropping it drains the queue.
pub struct AdmissionPermit<'a> {
    queue: &'a AdmissionQueue,
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.queue.release();
    }
}
