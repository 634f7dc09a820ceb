//! # Rider Routes
//!
//! - `GET    /riders`                  : list by status / district / work status
//! - `POST   /riders`                  : submit an application
//! - `GET    /riders/:id`              : one rider
//! - `GET    /riders/delivery-per-day` : delivered counts per day (bearer + rider)
//! - `PATCH  /riders/:id`              : approve or reject (bearer + admin)
//! - `DELETE /riders/:id`              : delete (bearer + admin)

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::auth::{require_bearer, AdminCaller, RiderCaller};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, extract_validated_json, parse_id};
use crate::repo::riders::{
    self, ApprovalUpdate, DailyDeliveries, DeliveriesQuery, NewRider, RiderQuery,
};
use crate::repo::{DeleteResult, InsertResult, UpdateResult};
use crate::state::{AppState, RiderRecord};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/riders", get(list_riders).post(create_rider))
        .route("/riders/:id", get(get_rider))
}

pub fn protected_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/riders/delivery-per-day",
            require_bearer(state, get(deliveries_per_day)),
        )
        .route(
            "/riders/:id",
            require_bearer(state, patch(set_approval_status).delete(delete_rider)),
        )
}

#[utoipa::path(
    get,
    path = "/riders",
    params(
        ("status" = Option<String>, Query, description = "pending | approved | rejected"),
        ("district" = Option<String>, Query, description = "Rider district"),
        ("workStatus" = Option<String>, Query, description = "available | in_delivery"),
    ),
    responses((status = 200, description = "Matching riders", body = Vec<RiderRecord>)),
    tag = "riders"
)]
async fn list_riders(
    State(state): State<AppState>,
    query: Result<Query<RiderQuery>, QueryRejection>,
) -> Result<Json<Vec<RiderRecord>>, AppError> {
    let query = extract_query(query)?;
    Ok(Json(riders::list(&state, &query)))
}

/// Submit a rider application. A repeat application for the same email
/// answers 200 with a message and stores nothing.
#[utoipa::path(
    post,
    path = "/riders",
    request_body = NewRider,
    responses(
        (status = 200, description = "Application stored, or already present", body = InsertResult),
        (status = 422, description = "Invalid application", body = crate::error::ErrorBody),
    ),
    tag = "riders"
)]
async fn create_rider(
    State(state): State<AppState>,
    body: Result<Json<NewRider>, JsonRejection>,
) -> Result<Json<InsertResult>, AppError> {
    let new = extract_validated_json(body)?;
    Ok(Json(riders::create(&state, new).await?))
}

#[utoipa::path(
    get,
    path = "/riders/{id}",
    params(("id" = String, Path, description = "Rider id")),
    responses(
        (status = 200, description = "Rider", body = RiderRecord),
        (status = 404, description = "Rider not found", body = crate::error::ErrorBody),
    ),
    tag = "riders"
)]
async fn get_rider(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RiderRecord>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(riders::get(&state, id)?))
}

#[utoipa::path(
    get,
    path = "/riders/delivery-per-day",
    params(("email" = String, Query, description = "Rider email")),
    responses(
        (status = 200, description = "Delivered parcels per day", body = Vec<DailyDeliveries>),
        (status = 403, description = "Caller is not a rider", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "riders"
)]
async fn deliveries_per_day(
    State(state): State<AppState>,
    _rider: RiderCaller,
    query: Result<Query<DeliveriesQuery>, QueryRejection>,
) -> Result<Json<Vec<DailyDeliveries>>, AppError> {
    let query = extract_query(query)?;
    Ok(Json(riders::deliveries_per_day(&state, &query.email)))
}

/// Approve or reject a rider. Approval promotes the matching user to `rider`.
#[utoipa::path(
    patch,
    path = "/riders/{id}",
    params(("id" = String, Path, description = "Rider id")),
    request_body = ApprovalUpdate,
    responses(
        (status = 200, description = "Rider updated", body = UpdateResult),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Rider not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "riders"
)]
async fn set_approval_status(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Path(id): Path<String>,
    body: Result<Json<ApprovalUpdate>, JsonRejection>,
) -> Result<Json<UpdateResult>, AppError> {
    let id = parse_id(&id)?;
    let update = extract_json(body)?;
    tracing::debug!(admin = %admin.email, rider_id = %id, "rider approval requested");
    Ok(Json(riders::set_approval_status(&state, id, update).await?))
}

#[utoipa::path(
    delete,
    path = "/riders/{id}",
    params(("id" = String, Path, description = "Rider id")),
    responses(
        (status = 200, description = "Delete outcome", body = DeleteResult),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "riders"
)]
async fn delete_rider(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(riders::delete(&state, id).await?))
}
