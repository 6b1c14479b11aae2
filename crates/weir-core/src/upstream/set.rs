//! Ordered, wraparound set of endpoints for one chain.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tracing::debug;

use crate::{
    config::Settings,
    types::ChainId,
    upstream::{
        endpoint::{Endpoint, EndpointSnapshot},
        selector::{self, ScoreWeights},
    },
};

/// The endpoints registered for a chain, plus the round-robin pointer.
///
/// The list is fixed at construction (layered config, then built-in
/// defaults, then the generic fallback — always at least one entry). The
/// pointer moves two ways: proactive selection parks it on the best-scoring
/// endpoint before every attempt, and rotation advances it by one after a
/// failure regardless of scores.
///
/// The pointer is a plain atomic read-modify-write without cross-method
/// atomicity; racing selections can only disagree about which endpoint is
/// heuristically "best", never corrupt state.
pub struct EndpointSet {
    chain: ChainId,
    endpoints: Vec<Arc<Endpoint>>,
    current: AtomicUsize,
}

impl EndpointSet {
    /// Builds the set from resolved settings.
    #[must_use]
    pub fn new(chain: ChainId, settings: &Settings) -> Self {
        let endpoints: Vec<Arc<Endpoint>> = settings
            .endpoint_urls(&chain)
            .into_iter()
            .map(|url| {
                let bucket = settings.endpoint_bucket(&chain, &url);
                Arc::new(Endpoint::new(url, bucket))
            })
            .collect();
        debug_assert!(!endpoints.is_empty(), "settings always resolve at least one endpoint");

        Self { chain, endpoints, current: AtomicUsize::new(0) }
    }

    #[must_use]
    pub fn chain(&self) -> &ChainId {
        &self.chain
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<Endpoint>> {
        self.endpoints.get(index)
    }

    /// Endpoints in registration order.
    #[must_use]
    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    /// Scores a fresh snapshot of every endpoint and parks the pointer on
    /// the winner. Runs immediately before each attempt.
    #[must_use]
    pub fn select(&self, weights: &ScoreWeights) -> Arc<Endpoint> {
        let snapshots = self.snapshots();
        let chosen = selector::select_best(&snapshots, self.current_index(), weights);
        self.current.store(chosen, Ordering::Relaxed);
        debug!(
            chain = %self.chain,
            endpoint = %self.endpoints[chosen].url(),
            index = chosen,
            "selected endpoint"
        );
        Arc::clone(&self.endpoints[chosen])
    }

    /// Advances the pointer to the next index with wraparound.
    ///
    /// The deterministic fallback after a failure; the subsequent selection
    /// starts (and on ties, stays) here.
    pub fn rotate(&self) {
        let next = (self.current.load(Ordering::Relaxed) + 1) % self.endpoints.len();
        self.current.store(next, Ordering::Relaxed);
    }

    /// Zeroes every endpoint's failure counter (chain-wide reset on any
    /// successful attempt).
    pub fn reset_failures(&self) {
        for endpoint in &self.endpoints {
            endpoint.reset_failures();
        }
    }

    /// Snapshots every endpoint in registration order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<EndpointSnapshot> {
        self.endpoints.iter().map(|endpoint| endpoint.snapshot()).collect()
    }

    /// Snapshots with their current scores, best first.
    #[must_use]
    pub fn ranked(&self, weights: &ScoreWeights) -> Vec<(EndpointSnapshot, f64)> {
        let mut ranked: Vec<_> = self
            .snapshots()
            .into_iter()
            .map(|snapshot| {
                let value = selector::score(&snapshot, weights);
                (snapshot, value)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}
