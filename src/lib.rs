//! OAuth2 authenticating reverse proxy library.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod routing;
pub mod security;

pub use config::schema::ProxyConfig;
pub use error::{ProxyError, StartupError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
