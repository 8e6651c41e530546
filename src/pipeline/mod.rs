//! Request pipeline.
//!
//! # Data Flow
//! ```text
//! Request
//!     → RateLimit (429 on deny, nothing else runs)
//!     → ResolveRoute (first prefix match, default target, or 502)
//!     → [protected only] ExtractToken → ValidateToken → Authorize → PropagateClaims
//!     → ProxyForwarder
//! ```
//!
//! # Design Decisions
//! - Stages are a closed enum applied in a fixed order, not a middleware stack
//! - Any stage error short-circuits and renders the JSON envelope
//! - The handler future owns every outbound call; dropping it cancels them

pub mod context;
pub mod orchestrator;
pub mod stage;

pub use context::RequestContext;
pub use orchestrator::Pipeline;
pub use stage::Stage;
