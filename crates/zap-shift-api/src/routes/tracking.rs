//! # Tracking Routes
//!
//! - `GET /tracking/:tracking_id/logs`: a parcel's lifecycle events, oldest first

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use zap_shift_core::TrackingId;

use crate::repo::ledger;
use crate::state::{AppState, TrackingLogEntry};

pub fn router() -> Router<AppState> {
    Router::new().route("/tracking/:tracking_id/logs", get(tracking_logs))
}

/// Unknown tracking ids yield an empty list.
#[utoipa::path(
    get,
    path = "/tracking/{tracking_id}/logs",
    params(("tracking_id" = String, Path, description = "Tracking id, e.g. PRCL-20260101-A1B2C3")),
    responses((status = 200, description = "Ledger entries", body = Vec<TrackingLogEntry>)),
    tag = "tracking"
)]
async fn tracking_logs(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> Json<Vec<TrackingLogEntry>> {
    let tracking_id = TrackingId::from_raw(tracking_id);
    Json(ledger::list_by_tracking(&state, &tracking_id))
}
