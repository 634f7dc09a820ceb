//! Tracking log persistence.
//!
//! All functions take a `&PgPool` and operate on the `tracking_logs` table.
//! Rows are appended and never updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use zap_shift_core::{ParcelStatus, TrackingId};

use crate::state::TrackingLogEntry;

/// Append one entry.
pub async fn insert(pool: &PgPool, entry: &TrackingLogEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO tracking_logs (tracking_id, status, details, created_at)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(entry.tracking_id.as_str())
    .bind(entry.status.as_str())
    .bind(&entry.details)
    .bind(entry.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the whole log in append order.
///
/// Rows whose status is not a known parcel status are skipped with a warning.
pub async fn load_all(pool: &PgPool) -> Result<Vec<TrackingLogEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TrackingLogRow>(
        "SELECT tracking_id, status, details, created_at
         FROM tracking_logs ORDER BY seq",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(TrackingLogRow::into_entry).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct TrackingLogRow {
    tracking_id: String,
    status: String,
    details: String,
    created_at: DateTime<Utc>,
}

impl TrackingLogRow {
    fn into_entry(self) -> Option<TrackingLogEntry> {
        let status: ParcelStatus = match self.status.parse() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(tracking_id = %self.tracking_id, error = %e, "skipping tracking log row");
                return None;
            }
        };
        Some(TrackingLogEntry {
            tracking_id: TrackingId::from_raw(self.tracking_id),
            status,
            details: self.details,
            created_at: self.created_at,
        })
    }
}
