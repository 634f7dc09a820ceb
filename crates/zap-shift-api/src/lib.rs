//! # zap-shift-api: Axum REST Service for Zap Shift
//!
//! Parcel delivery coordination over four document collections and an
//! append-only tracking ledger.
//!
//! ## API Surface
//!
//! | Prefix                      | Module                 | Auth                          |
//! |-----------------------------|------------------------|-------------------------------|
//! | `/parcels*`                 | [`routes::parcels`]    | mixed (list: bearer, rider view: rider) |
//! | `/riders*`                  | [`routes::riders`]     | mixed (approval/delete: admin) |
//! | `/users*`                   | [`routes::users`]      | bearer (role change: admin; create: none) |
//! | `/create-checkout-session`, `/payment-success`, `/payments` | [`routes::payments`] | listing: bearer |
//! | `/tracking/:tracking_id/logs` | [`routes::tracking`] | none                          |
//! | `/health/*`, `/metrics`, `/openapi.json`, `/` | this module | none               |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer → TraceLayer → MetricsMiddleware → [AuthMiddleware on protected routes] → Handler
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod repo;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::AppState;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use tower_http::cors::CorsLayer;

use crate::middleware::metrics::{ApiMetrics, MetricsSnapshot};

/// Assemble the full application router.
///
/// Protected methods carry the bearer-token middleware individually, so
/// unmatched paths still answer 404 and unsupported methods 405.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();

    let public = Router::new()
        .merge(routes::parcels::router())
        .merge(routes::riders::router())
        .merge(routes::users::router())
        .merge(routes::payments::router())
        .merge(routes::tracking::router())
        .merge(openapi::router());

    let protected = Router::new()
        .merge(routes::parcels::protected_router(&state))
        .merge(routes::riders::protected_router(&state))
        .merge(routes::users::protected_router(&state))
        .merge(routes::payments::protected_router(&state));

    Router::new()
        .route("/", get(root))
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics_snapshot))
        .merge(public)
        .merge(protected)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics))
        .layer(middleware::tracing_layer::layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "Zap Shift server is running!"
}

/// Liveness probe: always 200 while the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 503 when the configured database does not answer.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }
    (StatusCode::OK, "ready").into_response()
}

async fn metrics_snapshot(Extension(metrics): Extension<ApiMetrics>) -> Json<MetricsSnapshot> {
    Json(metrics.snapshot())
}
