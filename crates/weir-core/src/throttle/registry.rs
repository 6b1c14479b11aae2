//! Per-chain admission queue registry.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::{config::Settings, throttle::admission::AdmissionQueue, types::ChainId};

/// Owns one [`AdmissionQueue`] per chain, created lazily on first use.
///
/// The sole entry point for "admit this call". Constructed once at startup
/// and shared by reference; otherwise a pure lookup table. Queues are never
/// removed.
pub struct ThrottleRegistry {
    settings: Arc<Settings>,
    queues: DashMap<ChainId, Arc<AdmissionQueue>>,
}

impl ThrottleRegistry {
    #[must_use]
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings, queues: DashMap::new() }
    }

    /// Returns the chain's queue, creating it from resolved settings on
    /// first reference.
    #[must_use]
    pub fn queue_for(&self, chain: &ChainId) -> Arc<AdmissionQueue> {
        if let Some(queue) = self.queues.get(chain) {
            return Arc::clone(queue.value());
        }

        Arc::clone(
            self.queues
                .entry(chain.clone())
                .or_insert_with(|| {
                    let max_concurrent = self.settings.max_concurrent_for(chain);
                    let bucket = self.settings.chain_bucket(chain);
                    info!(
                        chain = %chain,
                        max_concurrent,
                        rate_capacity = bucket.capacity,
                        rate_limit = bucket.refill_per_sec,
                        "created admission queue"
                    );
                    Arc::new(AdmissionQueue::new(
                        chain.clone(),
                        max_concurrent,
                        bucket,
                        self.settings.queue_warn_depth,
                    ))
                })
                .value(),
        )
    }

    /// Chains with a live queue, for diagnostics.
    #[must_use]
    pub fn chains(&self) -> Vec<ChainId> {
        self.queues.iter().map(|entry| entry.key().clone()).collect()
    }
}
