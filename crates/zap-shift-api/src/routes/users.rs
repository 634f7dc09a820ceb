//! # User Routes
//!
//! - `GET   /users?searchText=` : search (bearer)
//! - `GET   /users/:id`         : one user (bearer)
//! - `GET   /users/:email/role` : role lookup (bearer)
//! - `POST  /users`             : create on first sign-in
//! - `PATCH /users/:id/role`    : change role (bearer + admin)
//!
//! The role lookup and role change share the `/users/:id/role` route; the
//! GET reads the segment as an email, the PATCH as a user id.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::{require_bearer, AdminCaller, VerifiedCaller};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, extract_validated_json, parse_id};
use crate::repo::users::{self, NewUser, RoleResponse, RoleUpdate, UserSearch};
use crate::repo::{InsertResult, UpdateResult};
use crate::state::{AppState, UserRecord};

pub fn router() -> Router<AppState> {
    Router::new().route("/users", post(create_user))
}

pub fn protected_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users", require_bearer(state, get(search_users)))
        .route("/users/:id", require_bearer(state, get(get_user)))
        .route(
            "/users/:id/role",
            require_bearer(state, get(get_role).patch(set_role)),
        )
}

/// Search users by display name or email. At most five results.
#[utoipa::path(
    get,
    path = "/users",
    params(("searchText" = Option<String>, Query, description = "Case-insensitive substring")),
    responses(
        (status = 200, description = "Matching users", body = Vec<UserRecord>),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
async fn search_users(
    State(state): State<AppState>,
    _caller: VerifiedCaller,
    query: Result<Query<UserSearch>, QueryRejection>,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    let query = extract_query(query)?;
    Ok(Json(users::search(&state, query.search_text.as_deref())))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserRecord),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
async fn get_user(
    State(state): State<AppState>,
    _caller: VerifiedCaller,
    Path(id): Path<String>,
) -> Result<Json<UserRecord>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(users::get(&state, id)?))
}

/// Role stored for an email; `user` when there is no record.
#[utoipa::path(
    get,
    path = "/users/{email}/role",
    params(("email" = String, Path, description = "User email")),
    responses((status = 200, description = "Role", body = RoleResponse)),
    security(("bearer_auth" = [])),
    tag = "users"
)]
async fn get_role(
    State(state): State<AppState>,
    _caller: VerifiedCaller,
    Path(email): Path<String>,
) -> Json<RoleResponse> {
    Json(RoleResponse {
        role: users::role_by_email(&state, &email),
    })
}

/// Create a user. An existing email answers 200 with a message.
#[utoipa::path(
    post,
    path = "/users",
    request_body = NewUser,
    responses(
        (status = 200, description = "User created, or already present", body = InsertResult),
        (status = 422, description = "Invalid user", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> Result<Json<InsertResult>, AppError> {
    let new = extract_validated_json(body)?;
    Ok(Json(users::create(&state, new).await?))
}

#[utoipa::path(
    patch,
    path = "/users/{id}/role",
    params(("id" = String, Path, description = "User id")),
    request_body = RoleUpdate,
    responses(
        (status = 200, description = "Role changed", body = UpdateResult),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown role", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
async fn set_role(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Path(id): Path<String>,
    body: Result<Json<RoleUpdate>, JsonRejection>,
) -> Result<Json<UpdateResult>, AppError> {
    let id = parse_id(&id)?;
    let RoleUpdate { role } = extract_json(body)?;
    tracing::debug!(admin = %admin.email, user_id = %id, role = %role, "role change requested");
    Ok(Json(users::set_role(&state, id, role).await?))
}
