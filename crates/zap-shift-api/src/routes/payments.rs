//! # Payment Routes
//!
//! - `POST  /create-checkout-session`      : start a hosted checkout
//! - `PATCH /payment-success?session_id=`  : reconcile a completed checkout
//! - `GET   /payments?customerEmail=`      : the caller's payments (bearer)

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::auth::{require_bearer, VerifiedCaller};
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json};
use crate::repo::payments::{
    self, CheckoutRequest, CheckoutResponse, PaymentQuery, PaymentSuccessQuery, ReconcileOutcome,
};
use crate::state::{AppState, PaymentRecord};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/payment-success", patch(payment_success))
}

pub fn protected_router(state: &AppState) -> Router<AppState> {
    Router::new().route("/payments", require_bearer(state, get(list_payments)))
}

/// Create a checkout session for one parcel and return the payer redirect URL.
#[utoipa::path(
    post,
    path = "/create-checkout-session",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checkout created", body = CheckoutResponse),
        (status = 422, description = "Invalid cost", body = crate::error::ErrorBody),
        (status = 502, description = "Gateway rejected the request", body = crate::error::ErrorBody),
        (status = 503, description = "Gateway not configured or unreachable", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
async fn create_checkout_session(
    State(state): State<AppState>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let req = extract_validated_json(body)?;
    Ok(Json(payments::create_checkout(&state, req).await?))
}

/// Reconcile a checkout session. Safe to call repeatedly for the same session.
#[utoipa::path(
    patch,
    path = "/payment-success",
    params(("session_id" = String, Query, description = "Checkout session id")),
    responses(
        (status = 200, description = "Reconciliation outcome", body = ReconcileOutcome),
        (status = 503, description = "Gateway not configured or unreachable", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
async fn payment_success(
    State(state): State<AppState>,
    query: Result<Query<PaymentSuccessQuery>, QueryRejection>,
) -> Result<Json<ReconcileOutcome>, AppError> {
    let query = extract_query(query)?;
    Ok(Json(
        payments::complete_checkout(&state, &query.session_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/payments",
    params(("customerEmail" = Option<String>, Query, description = "Must equal the caller's email")),
    responses(
        (status = 200, description = "Caller's payments, newest first", body = Vec<PaymentRecord>),
        (status = 403, description = "Email differs from the caller", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
async fn list_payments(
    State(state): State<AppState>,
    caller: VerifiedCaller,
    query: Result<Query<PaymentQuery>, QueryRejection>,
) -> Result<Json<Vec<PaymentRecord>>, AppError> {
    let query = extract_query(query)?;
    Ok(Json(payments::list(
        &state,
        &caller.email,
        query.customer_email.as_deref(),
    )?))
}
