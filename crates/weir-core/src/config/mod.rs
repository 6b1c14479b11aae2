//! Layered throttling configuration.
//!
//! # Configuration Hierarchy
//!
//! Values resolve through layers, most specific first:
//!
//! 1. **Per-endpoint override** (bucket sizing only)
//! 2. **Per-chain override**
//! 3. **Global defaults** (file-configured or compiled-in)
//!
//! Sources are loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: hardcoded in `Default` implementations
//! 2. **Config file**: TOML file named by the `WEIR_CONFIG` env var
//! 3. **Environment variables**: the flat keys below, chain name uppercased
//!    in the `{CHAIN}` position
//!
//! | Key | Effect |
//! |---|---|
//! | `MAX_CONCURRENT` / `MAX_CONCURRENT_{CHAIN}` | admission concurrency cap |
//! | `RATE_CAPACITY` / `RATE_CAPACITY_{CHAIN}` | bucket burst capacity |
//! | `RATE_LIMIT` / `RATE_LIMIT_{CHAIN}` | bucket refill rate (tokens/sec) |
//! | `ENDPOINT_URLS_{CHAIN}` | comma-separated endpoint list |
//!
//! Invalid numeric overrides (unparsable or non-positive) log a warning and
//! the next layer down is used instead; configuration problems are never
//! fatal at resolution time. [`Settings::validate`] exists for callers that
//! want hard errors on structurally bad static config.
//!
//! # Example
//!
//! ```toml
//! max_concurrent = 8
//! rate_capacity = 20
//! rate_limit = 10.0
//!
//! [chains.polygon]
//! max_concurrent = 4
//!
//! [[chains.polygon.endpoints]]
//! url = "https://polygon-rpc.com"
//! rate_limit = 25.0
//! ```

use std::collections::HashMap;

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{throttle::bucket::BucketConfig, types::ChainId, upstream::selector::ScoreWeights};

const DEFAULT_MAX_CONCURRENT: usize = 5;
const DEFAULT_RATE_CAPACITY: u32 = 10;
const DEFAULT_RATE_LIMIT: f64 = 5.0;
const DEFAULT_QUEUE_WARN_DEPTH: usize = 50;

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT
}
fn default_rate_capacity() -> u32 {
    DEFAULT_RATE_CAPACITY
}
fn default_rate_limit() -> f64 {
    DEFAULT_RATE_LIMIT
}
fn default_queue_warn_depth() -> usize {
    DEFAULT_QUEUE_WARN_DEPTH
}

/// Per-endpoint bucket overrides within a chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointSettings {
    /// Endpoint URL.
    pub url: String,

    /// Burst capacity override for this endpoint's bucket.
    #[serde(default)]
    pub rate_capacity: Option<u32>,

    /// Refill rate override for this endpoint's bucket (tokens/sec).
    #[serde(default)]
    pub rate_limit: Option<f64>,
}

/// Per-chain overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainSettings {
    /// Admission concurrency cap override.
    #[serde(default)]
    pub max_concurrent: Option<usize>,

    /// Chain-level bucket burst capacity override.
    #[serde(default)]
    pub rate_capacity: Option<u32>,

    /// Chain-level bucket refill rate override (tokens/sec).
    #[serde(default)]
    pub rate_limit: Option<f64>,

    /// Explicit endpoint list. Empty means "use built-in defaults".
    #[serde(default)]
    pub endpoints: Vec<EndpointSettings>,
}

/// Resolved application settings for the throttling core.
///
/// Constructed once at startup and shared by reference; the registries read
/// from it lazily as chains are first touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Global admission concurrency cap per chain. Defaults to `5`.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Global bucket burst capacity. Defaults to `10`.
    #[serde(default = "default_rate_capacity")]
    pub rate_capacity: u32,

    /// Global bucket refill rate in tokens per second. Defaults to `5.0`.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,

    /// Pending-queue depth that triggers a diagnostic warning. Defaults to
    /// `50`. The queue itself is never bounded.
    #[serde(default = "default_queue_warn_depth")]
    pub queue_warn_depth: usize,

    /// Per-chain overrides, keyed by lowercase chain name.
    #[serde(default)]
    pub chains: HashMap<String, ChainSettings>,

    /// Endpoint selection weights.
    #[serde(default)]
    pub scoring: ScoreWeights,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            rate_capacity: DEFAULT_RATE_CAPACITY,
            rate_limit: DEFAULT_RATE_LIMIT,
            queue_warn_depth: DEFAULT_QUEUE_WARN_DEPTH,
            chains: HashMap::new(),
            scoring: ScoreWeights::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the TOML file named by `WEIR_CONFIG` (if any),
    /// then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("WEIR_CONFIG").unwrap_or_else(|_| "config/weir.toml".to_string());
        Self::load_from(&path)
    }

    /// Loads settings from a specific TOML file (missing file is fine), then
    /// applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file exists but cannot be parsed.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let mut settings: Self = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?
            .try_deserialize()?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Compiled defaults plus environment overrides, no file layer.
    #[must_use]
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env_overrides();
        settings
    }

    /// Applies the documented process-environment keys on top of the
    /// current values. Invalid values warn and leave the layer below in
    /// place.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(std::env::vars());
    }

    fn apply_overrides_from(&mut self, vars: impl Iterator<Item = (String, String)>) {
        for (key, raw) in vars {
            if key == "MAX_CONCURRENT" {
                if let Some(value) = parse_count(&key, &raw) {
                    self.max_concurrent = value;
                }
            } else if key == "RATE_CAPACITY" {
                if let Some(value) = parse_capacity(&key, &raw) {
                    self.rate_capacity = value;
                }
            } else if key == "RATE_LIMIT" {
                if let Some(value) = parse_rate(&key, &raw) {
                    self.rate_limit = value;
                }
            } else if let Some(chain) = key.strip_prefix("MAX_CONCURRENT_") {
                let parsed = parse_count(&key, &raw);
                if let Some(value) = parsed {
                    self.chain_entry(chain).max_concurrent = Some(value);
                }
            } else if let Some(chain) = key.strip_prefix("RATE_CAPACITY_") {
                let parsed = parse_capacity(&key, &raw);
                if let Some(value) = parsed {
                    self.chain_entry(chain).rate_capacity = Some(value);
                }
            } else if let Some(chain) = key.strip_prefix("RATE_LIMIT_") {
                let parsed = parse_rate(&key, &raw);
                if let Some(value) = parsed {
                    self.chain_entry(chain).rate_limit = Some(value);
                }
            } else if let Some(chain) = key.strip_prefix("ENDPOINT_URLS_") {
                let endpoints: Vec<EndpointSettings> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(|url| EndpointSettings { url: url.to_string(), ..Default::default() })
                    .collect();
                if endpoints.is_empty() {
                    warn!(key = %key, "ignoring empty endpoint list override");
                } else {
                    self.chain_entry(chain).endpoints = endpoints;
                }
            }
        }
    }

    fn chain_entry(&mut self, chain: &str) -> &mut ChainSettings {
        self.chains.entry(chain.to_ascii_lowercase()).or_default()
    }

    fn chain_settings(&self, chain: &ChainId) -> Option<&ChainSettings> {
        self.chains.get(chain.as_str())
    }

    /// Resolves the admission concurrency cap for a chain.
    #[must_use]
    pub fn max_concurrent_for(&self, chain: &ChainId) -> usize {
        if let Some(value) = self.chain_settings(chain).and_then(|c| c.max_concurrent) {
            if value > 0 {
                return value;
            }
            warn!(chain = %chain, value, "ignoring non-positive per-chain max_concurrent");
        }
        if self.max_concurrent > 0 {
            return self.max_concurrent;
        }
        warn!(value = self.max_concurrent, "ignoring non-positive global max_concurrent");
        DEFAULT_MAX_CONCURRENT
    }

    fn resolve_capacity(&self, chain: &ChainId, per_endpoint: Option<u32>) -> f64 {
        for (value, layer) in [(per_endpoint, "per-endpoint"), (
            self.chain_settings(chain).and_then(|c| c.rate_capacity),
            "per-chain",
        )] {
            if let Some(value) = value {
                if value > 0 {
                    return f64::from(value);
                }
                warn!(chain = %chain, value, layer, "ignoring non-positive rate_capacity");
            }
        }
        if self.rate_capacity > 0 {
            return f64::from(self.rate_capacity);
        }
        warn!(value = self.rate_capacity, "ignoring non-positive global rate_capacity");
        f64::from(DEFAULT_RATE_CAPACITY)
    }

    fn resolve_rate(&self, chain: &ChainId, per_endpoint: Option<f64>) -> f64 {
        for (value, layer) in [(per_endpoint, "per-endpoint"), (
            self.chain_settings(chain).and_then(|c| c.rate_limit),
            "per-chain",
        )] {
            if let Some(value) = value {
                if value > 0.0 && value.is_finite() {
                    return value;
                }
                warn!(chain = %chain, value, layer, "ignoring non-positive rate_limit");
            }
        }
        if self.rate_limit > 0.0 && self.rate_limit.is_finite() {
            return self.rate_limit;
        }
        warn!(value = self.rate_limit, "ignoring non-positive global rate_limit");
        DEFAULT_RATE_LIMIT
    }

    /// Resolves the chain-level bucket configuration.
    #[must_use]
    pub fn chain_bucket(&self, chain: &ChainId) -> BucketConfig {
        BucketConfig {
            capacity: self.resolve_capacity(chain, None),
            refill_per_sec: self.resolve_rate(chain, None),
        }
    }

    /// Resolves an endpoint's bucket configuration: per-endpoint override,
    /// then per-chain, then global.
    #[must_use]
    pub fn endpoint_bucket(&self, chain: &ChainId, url: &str) -> BucketConfig {
        let endpoint = self
            .chain_settings(chain)
            .and_then(|c| c.endpoints.iter().find(|e| e.url == url));
        BucketConfig {
            capacity: self.resolve_capacity(chain, endpoint.and_then(|e| e.rate_capacity)),
            refill_per_sec: self.resolve_rate(chain, endpoint.and_then(|e| e.rate_limit)),
        }
    }

    /// Resolves the endpoint URL list for a chain: explicit list, then the
    /// built-in table for known chains, then the generic fallback. Always
    /// returns at least one URL.
    #[must_use]
    pub fn endpoint_urls(&self, chain: &ChainId) -> Vec<String> {
        if let Some(chain_settings) = self.chain_settings(chain) {
            let explicit: Vec<String> = chain_settings
                .endpoints
                .iter()
                .filter(|e| !e.url.trim().is_empty())
                .map(|e| e.url.clone())
                .collect();
            if !explicit.is_empty() {
                return explicit;
            }
        }

        if let Some(urls) = builtin_endpoints(chain.as_str()) {
            return urls.iter().map(|url| (*url).to_string()).collect();
        }

        vec![generic_fallback(chain.as_str())]
    }

    /// Validates static configuration for hard errors.
    ///
    /// Env-derived values are already filtered at resolution time; this
    /// catches structurally bad file config callers want to fail fast on.
    ///
    /// # Errors
    ///
    /// Returns a descriptive message for the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".to_string());
        }
        if self.rate_capacity == 0 {
            return Err("rate_capacity must be greater than 0".to_string());
        }
        if !(self.rate_limit > 0.0 && self.rate_limit.is_finite()) {
            return Err("rate_limit must be a positive number".to_string());
        }
        if self.queue_warn_depth == 0 {
            return Err("queue_warn_depth must be greater than 0".to_string());
        }
        for (chain, chain_settings) in &self.chains {
            for endpoint in &chain_settings.endpoints {
                if endpoint.url.trim().is_empty() {
                    return Err(format!("empty endpoint URL configured for chain {chain}"));
                }
                if !endpoint.url.starts_with("http") {
                    return Err(format!(
                        "invalid endpoint URL for chain {chain}: {}",
                        endpoint.url
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Built-in endpoint lists for the chains the system ships support for.
fn builtin_endpoints(chain: &str) -> Option<&'static [&'static str]> {
    match chain {
        "ethereum" => Some(&[
            "https://eth.llamarpc.com",
            "https://rpc.ankr.com/eth",
            "https://ethereum-rpc.publicnode.com",
        ]),
        "polygon" => Some(&[
            "https://polygon-rpc.com",
            "https://rpc.ankr.com/polygon",
            "https://polygon-bor-rpc.publicnode.com",
        ]),
        "arbitrum" => Some(&["https://arb1.arbitrum.io/rpc", "https://rpc.ankr.com/arbitrum"]),
        "optimism" => Some(&["https://mainnet.optimism.io", "https://rpc.ankr.com/optimism"]),
        "base" => Some(&["https://mainnet.base.org", "https://rpc.ankr.com/base"]),
        _ => None,
    }
}

/// Single generic endpoint for chains without a built-in list.
fn generic_fallback(chain: &str) -> String {
    format!("https://rpc.ankr.com/{chain}")
}

fn parse_count(key: &str, raw: &str) -> Option<usize> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            warn!(key = %key, value = %raw, "invalid concurrency override, using layered default");
            None
        }
    }
}

fn parse_capacity(key: &str, raw: &str) -> Option<u32> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            warn!(key = %key, value = %raw, "invalid capacity override, using layered default");
            None
        }
    }
}

fn parse_rate(key: &str, raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value > 0.0 && value.is_finite() => Some(value),
        _ => {
            warn!(key = %key, value = %raw, "invalid rate override, using layered default");
            None
        }
    }
}
