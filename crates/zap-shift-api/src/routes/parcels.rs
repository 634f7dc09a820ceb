//! # Parcel Routes
//!
//! - `GET    /parcels`                       : list by sender / status (bearer)
//! - `GET    /parcels/rider`                 : a rider's parcels (bearer + rider)
//! - `GET    /parcels/:id`                   : one parcel
//! - `GET    /parcels/delivery-status/stats` : counts per delivery status
//! - `POST   /parcels`                       : create
//! - `PATCH  /parcels/:id`                   : assign a rider
//! - `PATCH  /parcels/:id/status`            : move to a new delivery status
//! - `DELETE /parcels/:id`                   : delete

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::auth::{require_bearer, RiderCaller, VerifiedCaller};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, extract_validated_json, parse_id};
use crate::repo::parcels::{
    self, CreatedParcel, NewParcel, ParcelQuery, RiderAssignment, RiderParcelQuery,
    StatusCount, StatusUpdate,
};
use crate::repo::{DeleteResult, UpdateResult};
use crate::state::{AppState, ParcelRecord};

/// Routes open to any caller.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/parcels", post(create_parcel))
        .route("/parcels/delivery-status/stats", get(status_stats))
        .route(
            "/parcels/:id",
            get(get_parcel).patch(assign_rider).delete(delete_parcel),
        )
        .route("/parcels/:id/status", patch(update_status))
}

/// Routes behind bearer authentication.
pub fn protected_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/parcels", require_bearer(state, get(list_parcels)))
        .route("/parcels/rider", require_bearer(state, get(list_rider_parcels)))
}

/// List parcels, newest first.
#[utoipa::path(
    get,
    path = "/parcels",
    params(
        ("senderEmail" = Option<String>, Query, description = "Filter by sender"),
        ("deliveryStatus" = Option<String>, Query, description = "Filter by delivery status"),
    ),
    responses(
        (status = 200, description = "Matching parcels", body = Vec<ParcelRecord>),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown delivery status", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "parcels"
)]
async fn list_parcels(
    State(state): State<AppState>,
    _caller: VerifiedCaller,
    query: Result<Query<ParcelQuery>, QueryRejection>,
) -> Result<Json<Vec<ParcelRecord>>, AppError> {
    let query = extract_query(query)?;
    Ok(Json(parcels::list(&state, &query)?))
}

/// List a rider's parcels, oldest first.
#[utoipa::path(
    get,
    path = "/parcels/rider",
    params(
        ("riderEmail" = Option<String>, Query, description = "Rider email"),
        ("deliveryStatus" = Option<String>, Query, description = "Requested delivery status"),
    ),
    responses(
        (status = 200, description = "Rider parcels", body = Vec<ParcelRecord>),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not a rider", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "parcels"
)]
async fn list_rider_parcels(
    State(state): State<AppState>,
    _rider: RiderCaller,
    query: Result<Query<RiderParcelQuery>, QueryRejection>,
) -> Result<Json<Vec<ParcelRecord>>, AppError> {
    let query = extract_query(query)?;
    Ok(Json(parcels::list_for_rider(&state, &query)?))
}

#[utoipa::path(
    get,
    path = "/parcels/{id}",
    params(("id" = String, Path, description = "Parcel id")),
    responses(
        (status = 200, description = "Parcel", body = ParcelRecord),
        (status = 404, description = "Parcel not found", body = crate::error::ErrorBody),
    ),
    tag = "parcels"
)]
async fn get_parcel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ParcelRecord>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(parcels::get(&state, id)?))
}

#[utoipa::path(
    get,
    path = "/parcels/delivery-status/stats",
    responses((status = 200, description = "Parcel count per status", body = Vec<StatusCount>)),
    tag = "parcels"
)]
async fn status_stats(State(state): State<AppState>) -> Json<Vec<StatusCount>> {
    Json(parcels::status_stats(&state))
}

/// Create a parcel in `parcel_created` with a generated tracking id.
#[utoipa::path(
    post,
    path = "/parcels",
    request_body = NewParcel,
    responses(
        (status = 200, description = "Parcel created", body = CreatedParcel),
        (status = 422, description = "Invalid parcel", body = crate::error::ErrorBody),
    ),
    tag = "parcels"
)]
async fn create_parcel(
    State(state): State<AppState>,
    body: Result<Json<NewParcel>, JsonRejection>,
) -> Result<Json<CreatedParcel>, AppError> {
    let new = extract_validated_json(body)?;
    Ok(Json(parcels::create(&state, new).await?))
}

/// Assign a rider to a paid parcel.
#[utoipa::path(
    patch,
    path = "/parcels/{id}",
    params(("id" = String, Path, description = "Parcel id")),
    request_body = RiderAssignment,
    responses(
        (status = 200, description = "Rider assigned", body = UpdateResult),
        (status = 404, description = "Parcel not found", body = crate::error::ErrorBody),
        (status = 409, description = "Parcel cannot take a rider in its current status", body = crate::error::ErrorBody),
    ),
    tag = "parcels"
)]
async fn assign_rider(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<RiderAssignment>, JsonRejection>,
) -> Result<Json<UpdateResult>, AppError> {
    let id = parse_id(&id)?;
    let assignment = extract_json(body)?;
    Ok(Json(parcels::assign_rider(&state, id, assignment).await?))
}

#[utoipa::path(
    patch,
    path = "/parcels/{id}/status",
    params(("id" = String, Path, description = "Parcel id")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Status updated", body = UpdateResult),
        (status = 404, description = "Parcel not found", body = crate::error::ErrorBody),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown status", body = crate::error::ErrorBody),
    ),
    tag = "parcels"
)]
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<UpdateResult>, AppError> {
    let id = parse_id(&id)?;
    let update = extract_json(body)?;
    Ok(Json(parcels::update_status(&state, id, update).await?))
}

#[utoipa::path(
    delete,
    path = "/parcels/{id}",
    params(("id" = String, Path, description = "Parcel id")),
    responses((status = 200, description = "Delete outcome", body = DeleteResult)),
    tag = "parcels"
)]
async fn delete_parcel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(parcels::delete(&state, id).await?))
}
