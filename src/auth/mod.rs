//! Authentication and authorization subsystem.
//!
//! # Data Flow
//! ```text
//! Protected request:
//!     → token.rs (extract bearer token from Authorization)
//!     → validator.rs (ask the identity provider's user-info endpoint)
//!     → claims.rs (decode + normalize TokenInfo)
//!     → authorization.rs (required teams / scopes)
//!     → propagation.rs (project claims to X-User-* / X-Token-* headers)
//! ```
//!
//! # Design Decisions
//! - Tokens are opaque: no local signature check, the identity provider is
//!   the only authority and is reached over the configured transport
//! - Claims live for one request and are never cached
//! - Fail closed: any doubt is a 401 or 403

pub mod authorization;
pub mod claims;
pub mod propagation;
pub mod token;
pub mod validator;

pub use authorization::AuthorizationGate;
pub use claims::TokenInfo;
pub use propagation::{propagate, strip_identity_headers};
pub use token::extract_bearer;
pub use validator::TokenValidator;

/// Why a caller could not be authenticated. All variants map to 401.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("authorization header is missing")]
    MissingToken,

    #[error("malformed bearer token: {0}")]
    MalformedToken(&'static str),

    #[error("token rejected: {0}")]
    TokenInvalid(String),
}
