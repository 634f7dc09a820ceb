//! Tracking ledger operations.

use zap_shift_core::{ParcelStatus, TrackingId};

use crate::error::AppError;
use crate::state::{AppState, TrackingLogEntry};

/// Append one lifecycle event. Repeated calls append repeated entries.
pub async fn append(
    state: &AppState,
    tracking_id: &TrackingId,
    status: ParcelStatus,
) -> Result<TrackingLogEntry, AppError> {
    let entry = TrackingLogEntry::new(tracking_id.clone(), status);
    state.tracking.append(entry.clone());
    if let Some(pool) = &state.db_pool {
        crate::db::tracking_logs::insert(pool, &entry).await?;
    }
    tracing::debug!(tracking_id = %tracking_id, status = %status, "tracking event appended");
    Ok(entry)
}

/// Every entry for `tracking_id`, in append order.
pub fn list_by_tracking(state: &AppState, tracking_id: &TrackingId) -> Vec<TrackingLogEntry> {
    state.tracking.list_by_tracking(tracking_id)
}
