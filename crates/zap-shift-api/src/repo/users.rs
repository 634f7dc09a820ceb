//! User repository.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use zap_shift_core::Role;

use super::{persist, strip_reserved, InsertResult, UpdateResult};
use crate::db::documents::Collection;
use crate::error::AppError;
use crate::extractors::Validate;
use crate::state::{AppState, Extra, InsertOutcome, UserRecord};

const RESERVED: &[&str] = &["_id", "role", "createdAt"];

/// Maximum number of users returned by [`search`].
pub const SEARCH_LIMIT: usize = 5;

/// Query parameters for `GET /users`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearch {
    pub search_text: Option<String>,
}

/// Body of `POST /users`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub display_name: Option<String>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Extra,
}

impl Validate for NewUser {
    fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() {
            return Err("email must not be empty".into());
        }
        Ok(())
    }
}

/// Body of `PATCH /users/:id/role`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleUpdate {
    pub role: Role,
}

/// Response of `GET /users/:email/role`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    pub role: Role,
}

/// Users whose display name or email contains `text`, ignoring case.
///
/// Sorted by display name (users without one first), at most
/// [`SEARCH_LIMIT`] results.
pub fn search(state: &AppState, text: Option<&str>) -> Vec<UserRecord> {
    let needle = text.map(str::to_lowercase).unwrap_or_default();
    let mut users = state.users.filter(|u| {
        needle.is_empty()
            || u.email.to_lowercase().contains(&needle)
            || u
                .display_name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&needle))
    });
    users.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    users.truncate(SEARCH_LIMIT);
    users
}

pub fn get(state: &AppState, id: Uuid) -> Result<UserRecord, AppError> {
    state
        .users
        .get(&id)
        .ok_or_else(|| AppError::not_found("user", id))
}

/// The role stored for `email`, or `user` when there is no record.
pub fn role_by_email(state: &AppState, email: &str) -> Role {
    state
        .users
        .find(|u| u.email == email)
        .map(|u| u.role)
        .unwrap_or_default()
}

/// Create a user on first sign-in. Existing emails are left untouched.
pub async fn create(state: &AppState, new: NewUser) -> Result<InsertResult, AppError> {
    let NewUser {
        email,
        display_name,
        mut extra,
    } = new;
    strip_reserved(&mut extra, RESERVED);

    let record = UserRecord {
        id: Uuid::new_v4(),
        email,
        display_name,
        role: Role::User,
        created_at: Utc::now(),
        extra,
    };
    let email = record.email.clone();

    match state
        .users
        .insert_if_absent(record.id, record, |u| u.email == email)
    {
        InsertOutcome::Inserted(user) => {
            persist(state, Collection::Users, user.id, &user).await?;
            tracing::info!(user_id = %user.id, email = %email, "user created");
            Ok(InsertResult::inserted(user.id))
        }
        InsertOutcome::Existing(_) => Ok(InsertResult::already_exists("user exists")),
    }
}

pub async fn set_role(state: &AppState, id: Uuid, role: Role) -> Result<UpdateResult, AppError> {
    let mut previous = role;
    let user = state
        .users
        .update(&id, |u| {
            previous = u.role;
            u.role = role;
        })
        .ok_or_else(|| AppError::not_found("user", id))?;
    persist(state, Collection::Users, user.id, &user).await?;

    tracing::info!(user_id = %id, email = %user.email, from = %previous, to = %role, "user role changed");
    Ok(UpdateResult::matched(previous != role))
}
