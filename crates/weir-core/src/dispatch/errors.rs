//! The single error that crosses the dispatch boundary.
//!
//! Intermediate attempt failures are absorbed into the rotation loop; a call
//! either fully succeeds with one endpoint's result or fails with this.

use thiserror::Error;

use crate::types::ChainId;

/// Every configured endpoint was tried within one orchestrated call and all
/// of them failed.
///
/// Carries the tried URLs in attempt order and the final attempt's error as
/// the source. Generic over the caller operation's error type.
#[derive(Debug, Error)]
#[error(
    "all {} endpoints failed for chain {chain}; tried [{}]; last error: {source}",
    .urls.len(),
    .urls.join(", ")
)]
pub struct AllEndpointsFailed<E: std::error::Error + 'static> {
    chain: ChainId,
    urls: Vec<String>,
    #[source]
    source: E,
}

impl<E: std::error::Error + 'static> AllEndpointsFailed<E> {
    #[must_use]
    pub(crate) fn new(chain: ChainId, urls: Vec<String>, source: E) -> Self {
        Self { chain, urls, source }
    }

    /// Chain the exhausted call ran against.
    #[must_use]
    pub fn chain(&self) -> &ChainId {
        &self.chain
    }

    /// URLs tried, one entry per attempt, in order.
    #[must_use]
    pub fn attempted_urls(&self) -> &[String] {
        &self.urls
    }

    /// The final attempt's underlying error.
    #[must_use]
    pub fn last_error(&self) -> &E {
        &self.source
    }

    /// Consumes the wrapper, returning the final attempt's error.
    #[must_use]
    pub fn into_last_error(self) -> E {
        self.source
    }
}
