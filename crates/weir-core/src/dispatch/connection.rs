//! The collaborator boundary for building wire connections.
//!
//! The core never speaks the RPC protocol. Per attempt it hands the factory
//! a [`ConnectionSpec`] naming the chosen endpoint and the caller's batching
//! flags; whatever handle comes back is passed straight into the caller's
//! operation.

use std::sync::Arc;

use crate::types::ChainId;

/// Everything the factory needs to build one connection handle.
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    /// URL of the endpoint chosen for this attempt.
    pub url: Arc<str>,
    /// Chain the call is running against.
    pub chain: ChainId,
    /// Whether the handle should support request batching.
    pub enable_batch: bool,
    /// Whether the handle should support multicall aggregation.
    pub enable_multicall: bool,
}

/// Builds connection handles for the orchestrator.
///
/// Implementations own the actual wire client (HTTP, WebSocket, in-process
/// fake); construction must be cheap and infallible — connection errors
/// belong to the operation itself, where they count against the endpoint.
pub trait ConnectionFactory: Send + Sync {
    /// Opaque handle passed to the caller-supplied operation.
    type Connection: Send;

    /// Builds a handle bound to the given endpoint and flags.
    fn connect(&self, spec: ConnectionSpec) -> Self::Connection;
}

/// Forwarding impl so a shared `Arc<F>` can be injected wherever a
/// `ConnectionFactory` is expected (the design's injection seam).
impl<T: ConnectionFactory + ?Sized> ConnectionFactory for Arc<T> {
    type Connection = T::Connection;

    fn connect(&self, spec: ConnectionSpec) -> Self::Connection {
        (**self).connect(spec)
    }
}
