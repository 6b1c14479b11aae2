//! Rate limiting and admission control.
//!
//! Two layers bound outbound pressure per chain:
//!
//! 1. A continuous-refill [`RateBucket`] caps sustained request rate; the
//!    same primitive is embedded at chain level (in the admission queue) and
//!    per endpoint.
//! 2. An [`AdmissionQueue`] caps concurrently in-flight orchestrated calls,
//!    parking overflow in FIFO order.
//!
//! The [`ThrottleRegistry`] lazily builds one queue per chain from the
//! layered settings.

pub mod admission;
pub mod bucket;
pub mod registry;

pub use admission::{AdmissionPermit, AdmissionQueue, AdmissionStats};
pub use bucket::{BucketConfig, BucketSnapshot, RateBucket};
pub use registry::ThrottleRegistry;
