//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or embedded default
//!     → loader.rs (parse & deserialize, apply CLI/env overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_with_overrides, ConfigError, ConfigOverrides};
pub use schema::ApplicationConfig;
pub use schema::OAuth2Config;
pub use schema::ProxyConfig;
pub use schema::RateLimitConfig;
pub use schema::RouteConfig;
pub use schema::ServerConfig;
pub use schema::TeamClaim;
pub use schema::TeamConfig;
