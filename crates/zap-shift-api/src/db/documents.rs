//! Document collection persistence.
//!
//! Each collection is a table of `(id UUID, doc JSONB)` rows. Writes are
//! whole-document upserts; the in-memory store stays the source of truth
//! for reads.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// The persisted document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Parcels,
    Riders,
    Users,
    Payments,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Parcels => "parcels",
            Self::Riders => "riders",
            Self::Users => "users",
            Self::Payments => "payments",
        }
    }
}

/// Insert or replace a document.
pub async fn upsert<T: Serialize + Sync>(
    pool: &PgPool,
    collection: Collection,
    id: Uuid,
    doc: &T,
) -> Result<(), sqlx::Error> {
    let sql = format!(
        "INSERT INTO {} (id, doc) VALUES ($1, $2)
         ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
        collection.table()
    );
    sqlx::query(&sql)
        .bind(id)
        .bind(Json(doc))
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete a document. Returns whether a row was removed.
pub async fn delete(pool: &PgPool, collection: Collection, id: Uuid) -> Result<bool, sqlx::Error> {
    let sql = format!("DELETE FROM {} WHERE id = $1", collection.table());
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;

    Ok(result.rows_affected() > 0)
}

/// Load every document of a collection, oldest insert first.
pub async fn load_all<T: DeserializeOwned + Send + Unpin + 'static>(
    pool: &PgPool,
    collection: Collection,
) -> Result<Vec<T>, sqlx::Error> {
    let sql = format!(
        "SELECT doc FROM {} ORDER BY inserted_at",
        collection.table()
    );
    let rows: Vec<Json<T>> = sqlx::query_scalar(&sql).fetch_all(pool).await?;

    Ok(rows.into_iter().map(|Json(doc)| doc).collect())
}
