//! # Repositories
//!
//! Operations over the document collections in [`AppState`]. Each mutation
//! updates the in-memory store first and then writes through to Postgres
//! when a pool is configured.
//!
//! Multi-record operations (parcel + rider, parcel + payment + ledger) are
//! independent writes. A failure part-way leaves the earlier writes in place.
//!
//! Results follow the document-store acknowledgement shapes:
//! [`InsertResult`], [`UpdateResult`], [`DeleteResult`].

pub mod ledger;
pub mod parcels;
pub mod payments;
pub mod riders;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::documents::{self, Collection};
use crate::error::AppError;
use crate::state::{AppState, Extra};

/// Outcome of an insert. A duplicate creation is reported here with
/// `acknowledged = false` and a `message`, not as an error status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InsertResult {
    pub fn inserted(id: Uuid) -> Self {
        Self {
            acknowledged: true,
            inserted_id: Some(id),
            message: None,
        }
    }

    pub fn already_exists(message: &str) -> Self {
        Self {
            acknowledged: false,
            inserted_id: None,
            message: Some(message.to_string()),
        }
    }
}

/// Outcome of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
}

impl UpdateResult {
    pub fn matched(modified: bool) -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count: u64::from(modified),
        }
    }
}

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Write a document through to the database, if one is configured.
pub(crate) async fn persist<T: Serialize + Sync>(
    state: &AppState,
    collection: Collection,
    id: Uuid,
    doc: &T,
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        documents::upsert(pool, collection, id, doc).await?;
    }
    Ok(())
}

/// Delete a document from the database, if one is configured.
pub(crate) async fn unpersist(
    state: &AppState,
    collection: Collection,
    id: Uuid,
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        documents::delete(pool, collection, id).await?;
    }
    Ok(())
}

/// Drop client-supplied keys that the service owns.
pub(crate) fn strip_reserved(extra: &mut Extra, reserved: &[&str]) {
    for key in reserved {
        extra.remove(*key);
    }
}
