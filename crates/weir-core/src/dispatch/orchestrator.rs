//! The public entry point: admission, selection, token waits, and bounded
//! retry-with-rotation composed into one call contract.

use std::{future::Future, sync::Arc};

use tracing::{debug, warn};

use crate::{
    config::Settings,
    dispatch::{
        connection::{ConnectionFactory, ConnectionSpec},
        errors::AllEndpointsFailed,
    },
    throttle::{AdmissionStats, BucketSnapshot, ThrottleRegistry},
    types::{CallOptions, ChainId},
    upstream::{EndpointRegistry, EndpointSnapshot},
};

/// Aggregated per-chain view for diagnostics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChainStats {
    pub admission: AdmissionStats,
    pub chain_bucket: BucketSnapshot,
    /// Endpoint snapshots with their current scores, best first.
    pub endpoints: Vec<(EndpointSnapshot, f64)>,
}

/// Composes the throttling and failover layers behind a single operation:
/// "run this unit of work against chain X".
///
/// Holds the per-chain registries and the injected connection factory.
/// Construct one at startup and share it by reference; there is no hidden
/// global state.
pub struct Orchestrator<F: ConnectionFactory> {
    settings: Arc<Settings>,
    throttle: Arc<ThrottleRegistry>,
    endpoints: Arc<EndpointRegistry>,
    factory: F,
}

impl<F: ConnectionFactory> Orchestrator<F> {
    /// Creates an orchestrator with fresh registries built from `settings`.
    #[must_use]
    pub fn new(settings: Settings, factory: F) -> Self {
        let settings = Arc::new(settings);
        Self {
            throttle: Arc::new(ThrottleRegistry::new(Arc::clone(&settings))),
            endpoints: Arc::new(EndpointRegistry::new(Arc::clone(&settings))),
            settings,
            factory,
        }
    }

    /// Creates an orchestrator over externally owned registries.
    ///
    /// Lets embedders share registries with their own diagnostics surface,
    /// and tests inject pre-warmed state.
    #[must_use]
    pub fn with_registries(
        settings: Arc<Settings>,
        throttle: Arc<ThrottleRegistry>,
        endpoints: Arc<EndpointRegistry>,
        factory: F,
    ) -> Self {
        Self { settings, throttle, endpoints, factory }
    }

    #[must_use]
    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    #[must_use]
    pub fn throttle_registry(&self) -> &Arc<ThrottleRegistry> {
        &self.throttle
    }

    #[must_use]
    pub fn endpoint_registry(&self) -> &Arc<EndpointRegistry> {
        &self.endpoints
    }

    /// Runs `operation` against the chain's best endpoint, rotating through
    /// the remaining endpoints on failure.
    ///
    /// The whole call holds one admission slot: admission happens once,
    /// before the first attempt, and the slot is released when the call
    /// completes either way. Each attempt re-selects the best endpoint,
    /// waits for that endpoint's token, builds a connection handle via the
    /// factory, and invokes the operation. The first success wins; a failure
    /// rotates the endpoint pointer and retries until every configured
    /// endpoint has been attempted once.
    ///
    /// No deadline is imposed here — operations enforce their own timeouts —
    /// and queued admissions cannot be withdrawn.
    ///
    /// # Errors
    ///
    /// Returns [`AllEndpointsFailed`] when every attempt failed; the error
    /// lists each tried URL and carries the final attempt's error as its
    /// source.
    pub async fn execute_with_rotation<Op, Fut, T, E>(
        &self,
        chain: &ChainId,
        options: CallOptions,
        operation: Op,
    ) -> Result<T, AllEndpointsFailed<E>>
    where
        Op: Fn(F::Connection) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let queue = self.throttle.queue_for(chain);
        let _permit = queue.acquire().await;

        let waited = queue.bucket().wait_for_token().await;
        if !waited.is_zero() {
            debug!(
                chain = %chain,
                waited_ms = waited.as_millis() as u64,
                "chain rate limit delay"
            );
        }

        let set = self.endpoints.set_for(chain);
        let max_attempts = set.len();
        let mut tried: Vec<String> = Vec::with_capacity(max_attempts);
        let mut attempt = 0;

        loop {
            let endpoint = set.select(&self.settings.scoring);

            let waited = endpoint.bucket().wait_for_token().await;
            if !waited.is_zero() {
                debug!(
                    chain = %chain,
                    endpoint = %endpoint.url(),
                    waited_ms = waited.as_millis() as u64,
                    "endpoint rate limit delay"
                );
            }

            endpoint.begin_attempt();
            let connection = self.factory.connect(ConnectionSpec {
                url: endpoint.url_arc(),
                chain: chain.clone(),
                enable_batch: options.enable_batch,
                enable_multicall: options.enable_multicall,
            });

            match operation(connection).await {
                Ok(value) => {
                    endpoint.record_success();
                    set.reset_failures();
                    debug!(
                        chain = %chain,
                        endpoint = %endpoint.url(),
                        attempt,
                        "call succeeded"
                    );
                    return Ok(value);
                }
                Err(error) => {
                    endpoint.record_failure();
                    set.rotate();
                    tried.push(endpoint.url().to_string());

                    if attempt + 1 >= max_attempts {
                        warn!(
                            chain = %chain,
                            attempts = max_attempts,
                            last_endpoint = %endpoint.url(),
                            error = %error,
                            "all endpoints exhausted"
                        );
                        return Err(AllEndpointsFailed::new(chain.clone(), tried, error));
                    }

                    debug!(
                        chain = %chain,
                        endpoint = %endpoint.url(),
                        attempt,
                        error = %error,
                        "attempt failed, rotating"
                    );
                    attempt += 1;
                }
            }
        }
    }

    /// Point-in-time throttling and endpoint view for one chain.
    ///
    /// Touching a chain here creates its queue and endpoint set, matching
    /// the lazy semantics of the call path.
    #[must_use]
    pub fn chain_stats(&self, chain: &ChainId) -> ChainStats {
        let queue = self.throttle.queue_for(chain);
        let set = self.endpoints.set_for(chain);
        ChainStats {
            admission: queue.stats(),
            chain_bucket: queue.bucket().snapshot(),
            endpoints: set.ranked(&self.settings.scoring),
        }
    }
}
