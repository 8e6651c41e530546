//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, hardening)
//!     → ops.rs (/ops/* endpoints, outside the pipeline)
//!     → [pipeline decides route and identity]
//!     → request.rs (backend URI, header rewrite)
//!     → proxy.rs (forward, stream back)
//!     → response.rs (error envelope)
//!     → Send to client
//! ```

pub mod ops;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use proxy::ProxyForwarder;
pub use response::ErrorEnvelope;
pub use server::{AppState, HttpServer};
