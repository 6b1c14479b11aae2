//! Per-chain endpoint set registry.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::{config::Settings, types::ChainId, upstream::set::EndpointSet};

/// Owns one [`EndpointSet`] per chain, created lazily on first use.
///
/// Mirrors [`crate::throttle::ThrottleRegistry`]: constructed once at
/// startup, shared by reference, never torn down before process exit.
pub struct EndpointRegistry {
    settings: Arc<Settings>,
    sets: DashMap<ChainId, Arc<EndpointSet>>,
}

impl EndpointRegistry {
    #[must_use]
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings, sets: DashMap::new() }
    }

    /// Returns the chain's endpoint set, building it from resolved settings
    /// on first reference.
    #[must_use]
    pub fn set_for(&self, chain: &ChainId) -> Arc<EndpointSet> {
        if let Some(set) = self.sets.get(chain) {
            return Arc::clone(set.value());
        }

        Arc::clone(
            self.sets
                .entry(chain.clone())
                .or_insert_with(|| {
                    let set = EndpointSet::new(chain.clone(), &self.settings);
                    let urls: Vec<&str> =
                        set.endpoints().iter().map(|endpoint| endpoint.url()).collect();
                    info!(chain = %chain, count = set.len(), ?urls, "registered endpoint set");
                    Arc::new(set)
                })
                .value(),
        )
    }

    /// Chains with a live endpoint set, for diagnostics.
    #[must_use]
    pub fn chains(&self) -> Vec<ChainId> {
        self.sets.iter().map(|entry| entry.key().clone()).collect()
    }
}
