//! Parcel repository.
//!
//! Every status change goes through the configured [`TransitionPolicy`]
//! (strict by default). Creation, assignment and status updates each append
//! the new status to the tracking ledger.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use zap_shift_core::{Cost, CoreError, ParcelStatus, PaymentStatus, TrackingId, WorkStatus};

use super::{persist, strip_reserved, unpersist, DeleteResult, InsertResult, UpdateResult};
use crate::db::documents::Collection;
use crate::error::AppError;
use crate::extractors::Validate;
use crate::state::{AppState, Extra, ParcelRecord};

/// Keys a sender may not set on a new parcel.
const RESERVED: &[&str] = &[
    "_id",
    "trackingId",
    "deliveryStatus",
    "paymentStatus",
    "riderId",
    "riderName",
    "riderEmail",
    "createdAt",
];

/// How [`list_for_rider`] interprets a requested delivery status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiderParcelFilter {
    /// Only `parcel_delivered` is honoured; any other value (or none) lists
    /// every parcel that is not yet delivered.
    #[default]
    Legacy,
    /// The requested status is matched exactly; none lists undelivered parcels.
    Exact,
}

impl RiderParcelFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Exact => "exact",
        }
    }
}

impl fmt::Display for RiderParcelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiderParcelFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Self::Legacy),
            "exact" => Ok(Self::Exact),
            other => Err(CoreError::UnknownValue {
                kind: "rider parcel filter",
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /parcels`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelQuery {
    pub sender_email: Option<String>,
    /// Parsed in [`list`] so an unknown token answers like the rider listing.
    pub delivery_status: Option<String>,
}

/// Query parameters for `GET /parcels/rider`.
///
/// `delivery_status` stays a raw string: the legacy filter ignores values
/// it does not recognise.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderParcelQuery {
    pub rider_email: Option<String>,
    pub delivery_status: Option<String>,
}

/// Body of `POST /parcels`. Unrecognised fields are stored as sent.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewParcel {
    pub parcel_name: Option<String>,
    pub sender_email: Option<String>,
    pub cost: Option<Cost>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Extra,
}

impl Validate for NewParcel {
    fn validate(&self) -> Result<(), String> {
        if let Some(cost) = &self.cost {
            cost.value().map_err(|e| format!("cost: {e}"))?;
        }
        Ok(())
    }
}

/// Response of `POST /parcels`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedParcel {
    #[serde(flatten)]
    pub result: InsertResult,
    pub tracking_id: TrackingId,
}

/// Body of `PATCH /parcels/:id`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiderAssignment {
    pub rider_id: Uuid,
    pub rider_name: Option<String>,
    pub rider_email: String,
    /// Accepted for compatibility; the parcel's own tracking id is logged.
    pub tracking_id: Option<String>,
}

/// Body of `PATCH /parcels/:id/status`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub delivery_status: ParcelStatus,
    /// Rider to free when the parcel is delivered. Defaults to the assigned rider.
    pub rider_id: Option<Uuid>,
    /// Accepted for compatibility; the parcel's own tracking id is logged.
    pub tracking_id: Option<String>,
}

/// One row of `GET /parcels/delivery-status/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusCount {
    pub status: ParcelStatus,
    pub count: u64,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Parcels matching every given field, newest first.
pub fn list(state: &AppState, query: &ParcelQuery) -> Result<Vec<ParcelRecord>, AppError> {
    let wanted = query
        .delivery_status
        .as_deref()
        .map(str::parse::<ParcelStatus>)
        .transpose()?;

    let mut parcels = state.parcels.filter(|p| {
        if let Some(ref email) = query.sender_email {
            if p.sender_email.as_deref() != Some(email.as_str()) {
                return false;
            }
        }
        if let Some(status) = wanted {
            if p.delivery_status != status {
                return false;
            }
        }
        true
    });
    parcels.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(parcels)
}

/// Parcels for a rider, oldest first.
pub fn list_for_rider(
    state: &AppState,
    query: &RiderParcelQuery,
) -> Result<Vec<ParcelRecord>, AppError> {
    let wanted = match (state.config.rider_filter, query.delivery_status.as_deref()) {
        (RiderParcelFilter::Legacy, Some("parcel_delivered")) => {
            Some(ParcelStatus::ParcelDelivered)
        }
        (RiderParcelFilter::Legacy, _) | (RiderParcelFilter::Exact, None) => None,
        (RiderParcelFilter::Exact, Some(raw)) => Some(raw.parse::<ParcelStatus>()?),
    };

    let mut parcels = state.parcels.filter(|p| {
        if let Some(ref email) = query.rider_email {
            if p.rider_email.as_deref() != Some(email.as_str()) {
                return false;
            }
        }
        match wanted {
            Some(status) => p.delivery_status == status,
            None => p.delivery_status != ParcelStatus::ParcelDelivered,
        }
    });
    parcels.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(parcels)
}

pub fn get(state: &AppState, id: Uuid) -> Result<ParcelRecord, AppError> {
    state
        .parcels
        .get(&id)
        .ok_or_else(|| AppError::not_found("parcel", id))
}

/// Parcel counts grouped by delivery status.
pub fn status_stats(state: &AppState) -> Vec<StatusCount> {
    let mut counts: BTreeMap<ParcelStatus, u64> = BTreeMap::new();
    for parcel in state.parcels.list() {
        *counts.entry(parcel.delivery_status).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect()
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Store a new parcel in `parcel_created` with a fresh tracking id.
pub async fn create(state: &AppState, new: NewParcel) -> Result<CreatedParcel, AppError> {
    let NewParcel {
        parcel_name,
        sender_email,
        cost,
        mut extra,
    } = new;
    strip_reserved(&mut extra, RESERVED);

    let record = ParcelRecord {
        id: Uuid::new_v4(),
        parcel_name,
        sender_email,
        cost,
        tracking_id: TrackingId::generate(),
        delivery_status: ParcelStatus::ParcelCreated,
        payment_status: PaymentStatus::Unpaid,
        rider_id: None,
        rider_name: None,
        rider_email: None,
        created_at: Utc::now(),
        extra,
    };

    super::ledger::append(state, &record.tracking_id, ParcelStatus::ParcelCreated).await?;
    state.parcels.insert(record.id, record.clone());
    persist(state, Collection::Parcels, record.id, &record).await?;

    tracing::info!(
        parcel_id = %record.id,
        tracking_id = %record.tracking_id,
        "parcel created"
    );

    Ok(CreatedParcel {
        result: InsertResult::inserted(record.id),
        tracking_id: record.tracking_id,
    })
}

/// Assign a rider: parcel moves to `driver_assigned`, rider to `in_delivery`.
///
/// The parcel and rider writes are independent; a missing rider record is
/// logged and skipped.
pub async fn assign_rider(
    state: &AppState,
    id: Uuid,
    assignment: RiderAssignment,
) -> Result<UpdateResult, AppError> {
    let policy = state.config.transition_policy;
    let (before, parcel) = state
        .parcels
        .try_update(&id, |p| {
            policy.check(p.delivery_status, ParcelStatus::DriverAssigned)?;
            let before = p.clone();
            p.delivery_status = ParcelStatus::DriverAssigned;
            p.rider_id = Some(assignment.rider_id);
            p.rider_name = assignment.rider_name.clone();
            p.rider_email = Some(assignment.rider_email.clone());
            Ok::<_, CoreError>((before, p.clone()))
        })
        .ok_or_else(|| AppError::not_found("parcel", id))??;
    persist(state, Collection::Parcels, parcel.id, &parcel).await?;

    set_work_status(state, assignment.rider_id, WorkStatus::InDelivery).await?;

    super::ledger::append(state, &parcel.tracking_id, ParcelStatus::DriverAssigned).await?;

    tracing::info!(
        parcel_id = %parcel.id,
        tracking_id = %parcel.tracking_id,
        rider_id = %assignment.rider_id,
        email = %assignment.rider_email,
        "rider assigned"
    );

    Ok(UpdateResult::matched(before != parcel))
}

/// Move a parcel to a new delivery status.
///
/// Side effects on the rider:
/// - `parcel_delivered` frees the rider (`available`).
/// - `parcel_paid` from `driver_assigned` is a declined assignment: the
///   rider is freed and the rider fields are cleared from the parcel.
pub async fn update_status(
    state: &AppState,
    id: Uuid,
    update: StatusUpdate,
) -> Result<UpdateResult, AppError> {
    let policy = state.config.transition_policy;
    let next = update.delivery_status;

    let (before, parcel) = state
        .parcels
        .try_update(&id, |p| {
            policy.check(p.delivery_status, next)?;
            let before = p.clone();
            p.delivery_status = next;
            if next == ParcelStatus::ParcelPaid {
                p.rider_id = None;
                p.rider_name = None;
                p.rider_email = None;
            }
            Ok::<_, CoreError>((before, p.clone()))
        })
        .ok_or_else(|| AppError::not_found("parcel", id))??;
    persist(state, Collection::Parcels, parcel.id, &parcel).await?;

    match next {
        ParcelStatus::ParcelDelivered => {
            if let Some(rider_id) = update.rider_id.or(before.rider_id) {
                set_work_status(state, rider_id, WorkStatus::Available).await?;
            }
        }
        ParcelStatus::ParcelPaid => {
            if let Some(rider_id) = before.rider_id {
                set_work_status(state, rider_id, WorkStatus::Available).await?;
            }
        }
        _ => {}
    }

    super::ledger::append(state, &parcel.tracking_id, next).await?;

    tracing::info!(
        parcel_id = %parcel.id,
        tracking_id = %parcel.tracking_id,
        from = %before.delivery_status,
        to = %next,
        "parcel status updated"
    );

    Ok(UpdateResult::matched(before != parcel))
}

/// Remove a parcel. Tracking logs and payments are left in place.
pub async fn delete(state: &AppState, id: Uuid) -> Result<DeleteResult, AppError> {
    let removed = state.parcels.remove(&id);
    if removed.is_some() {
        unpersist(state, Collection::Parcels, id).await?;
        tracing::info!(parcel_id = %id, "parcel deleted");
    }
    Ok(DeleteResult {
        acknowledged: true,
        deleted_count: u64::from(removed.is_some()),
    })
}

async fn set_work_status(
    state: &AppState,
    rider_id: Uuid,
    work_status: WorkStatus,
) -> Result<(), AppError> {
    match state.riders.update(&rider_id, |r| r.work_status = work_status) {
        Some(rider) => persist(state, Collection::Riders, rider.id, &rider).await,
        None => {
            tracing::warn!(rider_id = %rider_id, work_status = %work_status, "rider not found, work status unchanged");
            Ok(())
        }
    }
}
