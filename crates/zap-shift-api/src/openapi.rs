//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-annotated handlers and schemas into one document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Registers the Firebase ID token bearer scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Firebase ID token: `Authorization: Bearer <token>`."))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Zap Shift API",
        version = "0.1.0",
        description = "Parcel delivery coordination: parcels, riders, users, hosted checkout and tracking logs.\n\nProtected endpoints take a Firebase ID token as a bearer token. Admin and rider endpoints additionally check the caller's stored role."
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server"),
    ),
    paths(
        // ── Parcels ─────────────────────────────────────────────────────
        crate::routes::parcels::list_parcels,
        crate::routes::parcels::list_rider_parcels,
        crate::routes::parcels::get_parcel,
        crate::routes::parcels::status_stats,
        crate::routes::parcels::create_parcel,
        crate::routes::parcels::assign_rider,
        crate::routes::parcels::update_status,
        crate::routes::parcels::delete_parcel,
        // ── Riders ──────────────────────────────────────────────────────
        crate::routes::riders::list_riders,
        crate::routes::riders::create_rider,
        crate::routes::riders::get_rider,
        crate::routes::riders::deliveries_per_day,
        crate::routes::riders::set_approval_status,
        crate::routes::riders::delete_rider,
        // ── Users ───────────────────────────────────────────────────────
        crate::routes::users::search_users,
        crate::routes::users::get_user,
        crate::routes::users::get_role,
        crate::routes::users::create_user,
        crate::routes::users::set_role,
        // ── Payments ────────────────────────────────────────────────────
        crate::routes::payments::create_checkout_session,
        crate::routes::payments::payment_success,
        crate::routes::payments::list_payments,
        // ── Tracking ────────────────────────────────────────────────────
        crate::routes::tracking::tracking_logs,
    ),
    components(
        schemas(
            // ── Domain primitives ───────────────────────────────────────
            zap_shift_core::ParcelStatus,
            zap_shift_core::PaymentStatus,
            zap_shift_core::RiderStatus,
            zap_shift_core::WorkStatus,
            zap_shift_core::Role,
            zap_shift_core::TrackingId,
            zap_shift_core::Cost,
            // ── Documents ───────────────────────────────────────────────
            crate::state::ParcelRecord,
            crate::state::RiderRecord,
            crate::state::UserRecord,
            crate::state::PaymentRecord,
            crate::state::TrackingLogEntry,
            // ── Write outcomes ──────────────────────────────────────────
            crate::repo::InsertResult,
            crate::repo::UpdateResult,
            crate::repo::DeleteResult,
            // ── Errors ──────────────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            // ── Request/response DTOs ───────────────────────────────────
            crate::repo::parcels::NewParcel,
            crate::repo::parcels::CreatedParcel,
            crate::repo::parcels::RiderAssignment,
            crate::repo::parcels::StatusUpdate,
            crate::repo::parcels::StatusCount,
            crate::repo::riders::NewRider,
            crate::repo::riders::ApprovalUpdate,
            crate::repo::riders::DailyDeliveries,
            crate::repo::users::NewUser,
            crate::repo::users::RoleUpdate,
            crate::repo::users::RoleResponse,
            crate::repo::payments::CheckoutRequest,
            crate::repo::payments::CheckoutResponse,
            crate::repo::payments::ReconcileOutcome,
            crate::middleware::metrics::MetricsSnapshot,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "parcels", description = "Parcel lifecycle: creation, rider assignment, status updates"),
        (name = "riders", description = "Rider applications, approval and delivery statistics"),
        (name = "users", description = "User registration, search and roles"),
        (name = "payments", description = "Hosted checkout and payment reconciliation"),
        (name = "tracking", description = "Append-only parcel tracking log"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
