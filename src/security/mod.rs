//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (process-wide token bucket, first pipeline stage)
//!     → headers.rs (hardening response headers, CORS)
//! ```
//!
//! # Design Decisions
//! - One bucket for the whole process, not per client
//! - A denied request never reaches routing or the identity provider
//! - Hardening headers never override what a backend already set

pub mod headers;
pub mod rate_limit;

pub use rate_limit::{Clock, MonotonicClock, RateLimiter};
