//! Pipeline stages.
//!
//! Each stage reads and extends the [`RequestContext`]; the first `Err`
//! ends the chain and becomes the response.

use crate::auth::{extract_bearer, propagate};
use crate::error::ProxyError;
use crate::observability::metrics;
use crate::pipeline::{Pipeline, RequestContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RateLimit,
    ResolveRoute,
    ExtractToken,
    ValidateToken,
    Authorize,
    PropagateClaims,
}

/// Stages every request passes.
pub const ENTRY_STAGES: [Stage; 2] = [Stage::RateLimit, Stage::ResolveRoute];

/// Stages added for routes that require teams or scopes.
pub const PROTECTED_STAGES: [Stage; 4] = [
    Stage::ExtractToken,
    Stage::ValidateToken,
    Stage::Authorize,
    Stage::PropagateClaims,
];

impl Stage {
    /// Post-routing stages for a route.
    pub fn for_route(protected: bool) -> &'static [Stage] {
        if protected {
            &PROTECTED_STAGES
        } else {
            &[]
        }
    }

    pub async fn apply(self, pipeline: &Pipeline, ctx: &mut RequestContext) -> Result<(), ProxyError> {
        match self {
            Stage::RateLimit => {
                if pipeline.limiter.allow() {
                    Ok(())
                } else {
                    metrics::record_rate_limited();
                    Err(ProxyError::RateLimitExceeded)
                }
            }
            Stage::ResolveRoute => {
                ctx.route = Some(pipeline.router.resolve(ctx.path())?);
                Ok(())
            }
            Stage::ExtractToken => {
                ctx.token = Some(extract_bearer(&ctx.headers)?);
                Ok(())
            }
            Stage::ValidateToken => {
                let validator = pipeline.validator.as_ref().ok_or_else(|| {
                    ProxyError::Internal("protected route without a token validator".into())
                })?;
                let token = ctx
                    .token
                    .as_deref()
                    .ok_or_else(|| ProxyError::Internal("token not extracted".into()))?;
                ctx.token_info = Some(validator.validate(token).await?);
                Ok(())
            }
            Stage::Authorize => {
                let (Some(info), Some(route)) = (&ctx.token_info, &ctx.route) else {
                    return Err(ProxyError::Internal("authorize before validation".into()));
                };
                pipeline.gate.check(info, route)
            }
            Stage::PropagateClaims => {
                if let Some(info) = &ctx.token_info {
                    ctx.identity_headers = propagate(info);
                }
                Ok(())
            }
        }
    }
}
