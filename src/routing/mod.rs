//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route lookup)
//!     → Return: matched Route, the default Route, or NoRoute
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Keep declaration order
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Plain case-sensitive prefix test, no regex or globbing
//! - Prefixes are raw string prefixes: `/a` also matches `/ab`
//! - First match wins (declaration order is significant)

pub mod router;

pub use router::{Route, Router, Team};
