//! # Authentication & Authorization
//!
//! The request pipeline for protected routes runs in stages, each returning
//! a typed `Result`:
//!
//! ```text
//! bearer_token(headers) → auth_middleware (IdentityVerifier) → VerifiedCaller
//!                                                            → AdminCaller / RiderCaller
//! ```
//!
//! [`auth_middleware`] verifies the ID token with the configured
//! [`IdentityVerifier`](zap_shift_gateway::IdentityVerifier) and injects a
//! [`VerifiedCaller`] into the request extensions. Handlers that need a
//! specific role take [`AdminCaller`] or [`RiderCaller`], which look up the
//! caller's user record and reject with 403 on a role mismatch.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use zap_shift_core::Role;

use crate::error::AppError;
use crate::state::AppState;

// ── Stage 1: header parsing ─────────────────────────────────────────────────

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".into()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("authorization header is not valid text".into()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            AppError::Unauthorized("authorization header must use Bearer scheme".into())
        })?
        .trim();

    if token.is_empty() {
        return Err(AppError::Unauthorized("missing bearer token".into()));
    }
    Ok(token)
}

// ── Stage 2: token verification ─────────────────────────────────────────────

/// The verified caller of a protected request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCaller {
    pub uid: String,
    pub email: String,
}

/// Verify the bearer token and attach a [`VerifiedCaller`] to the request.
///
/// Every request performs a fresh verification; nothing is cached.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Ok(token) => token.to_string(),
        Err(err) => {
            tracing::warn!(error = %err, "authentication failed");
            return err.into_response();
        }
    };

    let Some(verifier) = state.identity.clone() else {
        return AppError::UpstreamUnavailable(
            "identity verifier not configured. Set FIREBASE_PROJECT_ID.".into(),
        )
        .into_response();
    };

    match verifier.verify(&token).await {
        Ok(identity) => {
            request.extensions_mut().insert(VerifiedCaller {
                uid: identity.uid,
                email: identity.email,
            });
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(error = %err, "authentication failed: token rejected");
            AppError::from(err).into_response()
        }
    }
}

/// Put [`auth_middleware`] in front of the methods registered on `route`.
///
/// The method router's fallback stays unguarded, so an unsupported method on
/// a path shared with public routes still answers 405.
pub fn require_bearer(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(state.clone(), auth_middleware))
}

/// Extracts the identity that [`auth_middleware`] injected.
///
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for VerifiedCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedCaller>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Stage 3: role guard ─────────────────────────────────────────────────────

/// Check that the caller's user record carries `required`.
///
/// An absent user record is treated as a role mismatch.
pub fn require_role(
    state: &AppState,
    caller: &VerifiedCaller,
    required: Role,
) -> Result<(), AppError> {
    let role = state.users.find(|u| u.email == caller.email).map(|u| u.role);
    match role {
        Some(role) if role == required => Ok(()),
        Some(role) => {
            tracing::warn!(email = %caller.email, role = %role, required = %required, "role check failed");
            Err(AppError::Forbidden(format!("role '{required}' required")))
        }
        None => {
            tracing::warn!(email = %caller.email, required = %required, "role check failed: no user record");
            Err(AppError::Forbidden(format!("role '{required}' required")))
        }
    }
}

/// A verified caller holding the `admin` role.
#[derive(Debug, Clone)]
pub struct AdminCaller(pub VerifiedCaller);

/// A verified caller holding the `rider` role.
#[derive(Debug, Clone)]
pub struct RiderCaller(pub VerifiedCaller);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = VerifiedCaller::from_request_parts(parts, state).await?;
        require_role(state, &caller, Role::Admin)?;
        Ok(Self(caller))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RiderCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = VerifiedCaller::from_request_parts(parts, state).await?;
        require_role(state, &caller, Role::Rider)?;
        Ok(Self(caller))
    }
}
