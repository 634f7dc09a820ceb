//! Rider repository.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use zap_shift_core::{ParcelStatus, RiderStatus, Role, WorkStatus};

use super::{persist, strip_reserved, unpersist, DeleteResult, InsertResult, UpdateResult};
use crate::db::documents::Collection;
use crate::error::AppError;
use crate::extractors::Validate;
use crate::state::{AppState, Extra, InsertOutcome, RiderRecord};

const RESERVED: &[&str] = &["_id", "status", "workStatus", "createdAt"];

/// Query parameters for `GET /riders`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderQuery {
    pub status: Option<RiderStatus>,
    pub district: Option<String>,
    pub work_status: Option<WorkStatus>,
}

/// Body of `POST /riders`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewRider {
    pub name: Option<String>,
    pub rider_email: String,
    pub rider_district: Option<String>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Extra,
}

impl Validate for NewRider {
    fn validate(&self) -> Result<(), String> {
        if self.rider_email.trim().is_empty() {
            return Err("riderEmail must not be empty".into());
        }
        Ok(())
    }
}

/// Body of `PATCH /riders/:id`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalUpdate {
    pub status: RiderStatus,
    /// User to promote on approval. Defaults to the rider's own email.
    pub email: Option<String>,
}

/// Query parameters for `GET /riders/delivery-per-day`.
#[derive(Debug, Deserialize)]
pub struct DeliveriesQuery {
    pub email: String,
}

/// Delivered parcels per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyDeliveries {
    /// `DD-MM-YYYY`, UTC.
    pub day: String,
    pub delivered_count: u64,
}

/// Riders matching every given field, newest first.
pub fn list(state: &AppState, query: &RiderQuery) -> Vec<RiderRecord> {
    let mut riders = state.riders.filter(|r| {
        query.status.map_or(true, |s| r.status == s)
            && query.work_status.map_or(true, |w| r.work_status == w)
            && query
                .district
                .as_deref()
                .map_or(true, |d| r.rider_district.as_deref() == Some(d))
    });
    riders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    riders
}

pub fn get(state: &AppState, id: Uuid) -> Result<RiderRecord, AppError> {
    state
        .riders
        .get(&id)
        .ok_or_else(|| AppError::not_found("rider", id))
}

/// Store a rider application as `pending`. A second application for the
/// same email is reported through [`InsertResult::already_exists`].
pub async fn create(state: &AppState, new: NewRider) -> Result<InsertResult, AppError> {
    let NewRider {
        name,
        rider_email,
        rider_district,
        mut extra,
    } = new;
    strip_reserved(&mut extra, RESERVED);

    let record = RiderRecord {
        id: Uuid::new_v4(),
        name,
        rider_email,
        rider_district,
        status: RiderStatus::Pending,
        work_status: WorkStatus::Available,
        created_at: Utc::now(),
        extra,
    };
    let email = record.rider_email.clone();

    match state
        .riders
        .insert_if_absent(record.id, record, |r| r.rider_email == email)
    {
        InsertOutcome::Inserted(rider) => {
            persist(state, Collection::Riders, rider.id, &rider).await?;
            tracing::info!(rider_id = %rider.id, email = %email, "rider application stored");
            Ok(InsertResult::inserted(rider.id))
        }
        InsertOutcome::Existing(_) => {
            tracing::debug!(email = %email, "duplicate rider application");
            Ok(InsertResult::already_exists("Rider already exists"))
        }
    }
}

/// Set a rider's approval status and mark them available. Approval also
/// promotes the matching user to the `rider` role.
pub async fn set_approval_status(
    state: &AppState,
    id: Uuid,
    update: ApprovalUpdate,
) -> Result<UpdateResult, AppError> {
    let mut before = None;
    let rider = state
        .riders
        .update(&id, |r| {
            before = Some(r.clone());
            r.status = update.status;
            r.work_status = WorkStatus::Available;
        })
        .ok_or_else(|| AppError::not_found("rider", id))?;
    persist(state, Collection::Riders, rider.id, &rider).await?;

    if update.status == RiderStatus::Approved {
        let email = update.email.unwrap_or_else(|| rider.rider_email.clone());
        match state
            .users
            .update_where(|u| u.email == email, |u| u.role = Role::Rider)
        {
            Some(user) => {
                persist(state, Collection::Users, user.id, &user).await?;
                tracing::info!(email = %email, "user promoted to rider");
            }
            None => tracing::warn!(email = %email, "approved rider has no user record"),
        }
    }

    tracing::info!(rider_id = %id, status = %update.status, "rider status updated");
    Ok(UpdateResult::matched(before.as_ref() != Some(&rider)))
}

pub async fn delete(state: &AppState, id: Uuid) -> Result<DeleteResult, AppError> {
    let removed = state.riders.remove(&id);
    if removed.is_some() {
        unpersist(state, Collection::Riders, id).await?;
        tracing::info!(rider_id = %id, "rider deleted");
    }
    Ok(DeleteResult {
        acknowledged: true,
        deleted_count: u64::from(removed.is_some()),
    })
}

/// Count a rider's delivered parcels by the day of their `parcel_delivered`
/// ledger entry, oldest day first.
///
/// A parcel with several delivered entries counts once per entry.
pub fn deliveries_per_day(state: &AppState, rider_email: &str) -> Vec<DailyDeliveries> {
    let delivered = state.parcels.filter(|p| {
        p.delivery_status == ParcelStatus::ParcelDelivered
            && p.rider_email.as_deref() == Some(rider_email)
    });

    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for parcel in &delivered {
        for entry in state.tracking.list_by_tracking(&parcel.tracking_id) {
            if entry.status == ParcelStatus::ParcelDelivered {
                *per_day.entry(entry.created_at.date_naive()).or_default() += 1;
            }
        }
    }

    per_day
        .into_iter()
        .map(|(day, delivered_count)| DailyDeliveries {
            day: day.format("%d-%m-%Y").to_string(),
            delivered_count,
        })
        .collect()
}
