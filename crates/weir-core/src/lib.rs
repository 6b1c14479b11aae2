//! # Weir Core
//!
//! Core library for Weir, an outbound-request throttling and failover layer
//! for multi-chain RPC workloads.
//!
//! Weir sits between an application and a fixed set of upstream JSON-RPC
//! endpoints grouped per logical network ("chain"). It bounds how hard the
//! application may hit those endpoints and recovers automatically from
//! transient endpoint failures. The crate provides:
//!
//! - **[`throttle`]**: continuous-refill token buckets plus a per-chain
//!   bounded-concurrency admission queue with FIFO overflow.
//!
//! - **[`upstream`]**: per-chain endpoint sets with rolling success/failure
//!   counters, a pure multi-factor selection heuristic, and round-robin
//!   rotation on failure.
//!
//! - **[`dispatch`]**: the orchestrator composing admission, selection,
//!   token waits, and bounded retry-with-rotation into a single call
//!   contract.
//!
//! - **[`config`]**: layered settings (per-endpoint → per-chain → global)
//!   loaded from TOML with process-environment overrides.
//!
//! ## Call Flow
//!
//! ```text
//! caller
//!   │
//!   ▼
//! Orchestrator::execute_with_rotation(chain, options, operation)
//!   │
//!   ▼
//! ThrottleRegistry ──► AdmissionQueue (slot free? run : FIFO queue)
//!   │                        │
//!   │                        ▼
//!   │                  chain RateBucket wait
//!   ▼
//! EndpointRegistry ──► EndpointSet
//!   │                        │
//!   │    ┌───────────────────┴──────────────────┐
//!   │    ▼                                      │
//!   │  selector (score snapshot, pick best)     │ retry while
//!   │    │                                      │ attempts remain
//!   │    ▼                                      │
//!   │  endpoint RateBucket wait                 │
//!   │    │                                      │
//!   │    ▼                                      │
//!   │  ConnectionFactory::connect ──► operation │
//!   │    │                                      │
//!   │    ├── Ok ──► record success, chain-wide failure reset, return
//!   │    └── Err ─► record failure, rotate pointer ──┘
//!   ▼
//! AllEndpointsFailed (every endpoint tried and failed)
//! ```
//!
//! The wire protocol is out of scope: the caller supplies a
//! [`dispatch::ConnectionFactory`] that builds an opaque connection handle
//! per attempt, and an asynchronous operation run against that handle.
//!
//! Registries are plain objects constructed once at startup and shared by
//! reference; the crate holds no global state.

pub mod config;
pub mod dispatch;
pub mod throttle;
pub mod types;
pub mod upstream;
