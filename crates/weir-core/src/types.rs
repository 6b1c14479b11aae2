//! Shared value types used across the throttling and dispatch layers.

use std::{fmt, sync::Arc};

/// Identifier for a logical network ("chain").
///
/// A chain groups a set of upstream endpoints behind one admission queue and
/// one rate-limit scope. Names are normalized to lowercase at construction so
/// `"Polygon"`, `"POLYGON"` and `"polygon"` key the same state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId(Arc<str>);

impl ChainId {
    /// Creates a chain id, trimming whitespace and lowercasing the name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name.trim().to_ascii_lowercase()))
    }

    /// Returns the normalized chain name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ChainId {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

/// Per-call options forwarded to the connection factory.
///
/// These only shape the connection handle built for each attempt; the core
/// itself attaches no meaning to them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Request a batching-capable connection handle.
    pub enable_batch: bool,
    /// Request a multicall-capable connection handle.
    pub enable_multicall: bool,
}

impl CallOptions {
    /// Options with batching enabled.
    #[must_use]
    pub fn batch() -> Self {
        Self { enable_batch: true, enable_multicall: false }
    }

    /// Options with batching and multicall enabled.
    #[must_use]
    pub fn batch_and_multicall() -> Self {
        Self { enable_batch: true, enable_multicall: true }
    }
}
