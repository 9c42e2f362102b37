//! Authentication and role gates, applied as route layers.
//!
//! `authenticate` must wrap `authorize`: the role gate reads the claims that
//! authentication leaves in the request extensions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::{claims::{Claims, Role}, jwt::JwtKeys};
use crate::error::{AppError, INVALID_TOKEN, NOT_AUTHENTICATED, NO_TOKEN};

/// Pulls the token out of `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(request: &Request) -> Option<&str> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

pub async fn authenticate(
    State(keys): State<JwtKeys>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or(AppError::Unauthorized(NO_TOKEN))?;
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::Unauthorized(INVALID_TOKEN)
    })?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// The set of roles allowed through [`authorize`].
#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: Arc<[Role]>,
}

impl RoleGate {
    pub fn new(allowed: impl Into<Arc<[Role]>>) -> Self {
        Self {
            allowed: allowed.into(),
        }
    }

    pub fn check(&self, claims: Option<&Claims>) -> Result<(), AppError> {
        let claims = claims.ok_or(AppError::Unauthorized(NOT_AUTHENTICATED))?;
        if !self.allowed.contains(&claims.role) {
            warn!(user_id = %claims.id, role = %claims.role, "role not permitted");
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

pub async fn authorize(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    gate.check(request.extensions().get::<Claims>())?;
    Ok(next.run(request).await)
}
