//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! Four document collections (parcels, riders, users, payments) live in
//! in-memory [`Store`]s, and the tracking log lives in an append-only
//! [`Ledger`]. When a database pool is configured every mutation is written
//! through to Postgres and the stores are hydrated from it at startup.
//!
//! The payment gateway and identity verifier are optional: when their
//! environment is not configured the endpoints that need them return 503.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;
use zap_shift_core::{
    Cost, CoreError, ParcelStatus, PaymentStatus, RiderStatus, Role, TrackingId,
    TransitionPolicy, WorkStatus,
};
use zap_shift_gateway::{IdentityVerifier, PaymentGateway};

use crate::repo::parcels::RiderParcelFilter;

/// Extra document fields kept verbatim alongside the typed ones.
pub type Extra = serde_json::Map<String, serde_json::Value>;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory document collection.
///
/// The lock is `parking_lot` and is never held across `.await` points.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

/// Result of [`Store::insert_if_absent`].
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome<T> {
    /// The record was stored.
    Inserted(T),
    /// A conflicting record already existed; nothing was written.
    Existing(T),
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Insert `value` unless some stored record satisfies `conflicts`.
    ///
    /// The scan and the insert happen under one write lock, so two
    /// concurrent calls for the same key cannot both insert.
    pub fn insert_if_absent(
        &self,
        id: Uuid,
        value: T,
        conflicts: impl Fn(&T) -> bool,
    ) -> InsertOutcome<T> {
        let mut guard = self.data.write();
        if let Some(existing) = guard.values().find(|v| conflicts(v)) {
            return InsertOutcome::Existing(existing.clone());
        }
        guard.insert(id, value.clone());
        InsertOutcome::Inserted(value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// First record matching `pred`.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// All records matching `pred`, in no particular order.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with
    /// the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Update the first record matching `pred`.
    pub fn update_where(&self, pred: impl Fn(&T) -> bool, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        let entry = guard.values_mut().find(|v| pred(v))?;
        f(entry);
        Some(entry.clone())
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Tracking Ledger ----------------------------------------------------------

/// One lifecycle event in a parcel's tracking stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingLogEntry {
    pub tracking_id: TrackingId,
    pub status: ParcelStatus,
    /// The status with underscores replaced by spaces.
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl TrackingLogEntry {
    pub fn new(tracking_id: TrackingId, status: ParcelStatus) -> Self {
        Self {
            tracking_id,
            details: status.details(),
            status,
            created_at: Utc::now(),
        }
    }
}

/// Append-only tracking log, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Arc<RwLock<Vec<TrackingLogEntry>>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, entry: TrackingLogEntry) {
        self.entries.write().push(entry);
    }

    /// Entries for one tracking id, oldest first.
    pub fn list_by_tracking(&self, tracking_id: &TrackingId) -> Vec<TrackingLogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| &e.tracking_id == tracking_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// -- Document Types -----------------------------------------------------------

/// A parcel document.
///
/// Sender-supplied fields the service does not interpret (receiver address,
/// weight, parcel type...) are carried in `extra` and returned unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParcelRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default)]
    pub parcel_name: Option<String>,
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub cost: Option<Cost>,
    pub tracking_id: TrackingId,
    pub delivery_status: ParcelStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub rider_id: Option<Uuid>,
    #[serde(default)]
    pub rider_name: Option<String>,
    #[serde(default)]
    pub rider_email: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Extra,
}

/// A rider application document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiderRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub rider_email: String,
    #[serde(default)]
    pub rider_district: Option<String>,
    #[serde(default)]
    pub status: RiderStatus,
    #[serde(default)]
    pub work_status: WorkStatus,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Extra,
}

/// A user account document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Absent on legacy documents; reads as `user`.
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Extra,
}

/// A reconciled payment. `transaction_id` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub transaction_id: String,
    pub parcel_id: String,
    #[serde(default)]
    pub parcel_name: Option<String>,
    pub customer_email: String,
    /// Major currency units.
    pub amount: f64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub tracking_id: TrackingId,
    pub paid_at: DateTime<Utc>,
}

// -- Application State --------------------------------------------------------

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Public site origin used to build checkout redirect URLs.
    pub site_domain: String,
    /// How parcel status changes are validated.
    pub transition_policy: TransitionPolicy,
    /// How the rider parcel listing interprets its status filter.
    pub rider_filter: RiderParcelFilter,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            site_domain: "http://localhost:5173".to_string(),
            transition_policy: TransitionPolicy::default(),
            rider_filter: RiderParcelFilter::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 3000)
    /// - `SITE_DOMAIN` (default: `http://localhost:5173`)
    /// - `PARCEL_TRANSITIONS` = `strict` | `permissive` (default: strict)
    /// - `RIDER_PARCEL_FILTER` = `legacy` | `exact` (default: legacy)
    pub fn from_env() -> Result<Self, CoreError> {
        let defaults = Self::default();
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let site_domain = std::env::var("SITE_DOMAIN")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.site_domain);
        let transition_policy = match std::env::var("PARCEL_TRANSITIONS") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.transition_policy,
        };
        let rider_filter = match std::env::var("RIDER_PARCEL_FILTER") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.rider_filter,
        };

        Ok(Self {
            port,
            site_domain,
            transition_policy,
            rider_filter,
        })
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub parcels: Store<ParcelRecord>,
    pub riders: Store<RiderRecord>,
    pub users: Store<UserRecord>,
    pub payments: Store<PaymentRecord>,
    pub tracking: Ledger,
    /// Postgres pool for write-through persistence. `None` means in-memory only.
    pub db_pool: Option<PgPool>,
    /// Hosted checkout client. `None` when `STRIPE_SECRET` is unset.
    pub payment_gateway: Option<Arc<dyn PaymentGateway>>,
    /// ID token verifier. `None` when `FIREBASE_PROJECT_ID` is unset.
    pub identity: Option<Arc<dyn IdentityVerifier>>,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory state with default configuration and no external services.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            parcels: Store::new(),
            riders: Store::new(),
            users: Store::new(),
            payments: Store::new(),
            tracking: Ledger::new(),
            db_pool: None,
            payment_gateway: None,
            identity: None,
            config,
        }
    }

    pub fn with_db(mut self, pool: Option<PgPool>) -> Self {
        self.db_pool = pool;
        self
    }

    pub fn with_payment_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.payment_gateway = Some(gateway);
        self
    }

    pub fn with_identity(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.identity = Some(verifier);
        self
    }

    /// Load every collection and the tracking log from the database.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        use crate::db::documents::{load_all, Collection};

        let parcels: Vec<ParcelRecord> = load_all(pool, Collection::Parcels)
            .await
            .map_err(|e| format!("failed to load parcels: {e}"))?;
        let parcel_count = parcels.len();
        for record in parcels {
            self.parcels.insert(record.id, record);
        }

        let riders: Vec<RiderRecord> = load_all(pool, Collection::Riders)
            .await
            .map_err(|e| format!("failed to load riders: {e}"))?;
        let rider_count = riders.len();
        for record in riders {
            self.riders.insert(record.id, record);
        }

        let users: Vec<UserRecord> = load_all(pool, Collection::Users)
            .await
            .map_err(|e| format!("failed to load users: {e}"))?;
        let user_count = users.len();
        for record in users {
            self.users.insert(record.id, record);
        }

        let payments: Vec<PaymentRecord> = load_all(pool, Collection::Payments)
            .await
            .map_err(|e| format!("failed to load payments: {e}"))?;
        let payment_count = payments.len();
        for record in payments {
            self.payments.insert(record.id, record);
        }

        let logs = crate::db::tracking_logs::load_all(pool)
            .await
            .map_err(|e| format!("failed to load tracking logs: {e}"))?;
        let log_count = logs.len();
        for entry in logs {
            self.tracking.append(entry);
        }

        tracing::info!(
            parcels = parcel_count,
            riders = rider_count,
            users = user_count,
            payments = payment_count,
            tracking_logs = log_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        key: &'static str,
        n: u32,
    }

    #[test]
    fn insert_if_absent_returns_existing_on_conflict() {
        let store: Store<Doc> = Store::new();
        let first = store.insert_if_absent(Uuid::new_v4(), Doc { key: "a", n: 1 }, |d| d.key == "a");
        assert!(matches!(first, InsertOutcome::Inserted(_)));

        let second =
            store.insert_if_absent(Uuid::new_v4(), Doc { key: "a", n: 2 }, |d| d.key == "a");
        assert_eq!(second, InsertOutcome::Existing(Doc { key: "a", n: 1 }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn concurrent_insert_if_absent_stores_one() {
        let store: Store<Doc> = Store::new();
        let handles: Vec<_> = (0..16)
            .map(|n| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.insert_if_absent(Uuid::new_v4(), Doc { key: "same", n }, |d| {
                        d.key == "same"
                    })
                })
            })
            .collect();
        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| matches!(o, InsertOutcome::Inserted(_)))
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_where_touches_first_match_only() {
        let store: Store<Doc> = Store::new();
        store.insert(Uuid::new_v4(), Doc { key: "a", n: 1 });
        store.insert(Uuid::new_v4(), Doc { key: "b", n: 1 });
        let updated = store.update_where(|d| d.key == "b", |d| d.n = 9).unwrap();
        assert_eq!(updated.n, 9);
        assert_eq!(store.filter(|d| d.n == 9).len(), 1);
        assert!(store.update_where(|d| d.key == "zzz", |d| d.n = 0).is_none());
    }

    #[test]
    fn ledger_keeps_insertion_order_and_duplicates() {
        let ledger = Ledger::new();
        let id = TrackingId::from_raw("PRCL-20260101-AAAAAA");
        let other = TrackingId::from_raw("PRCL-20260101-BBBBBB");
        ledger.append(TrackingLogEntry::new(id.clone(), ParcelStatus::ParcelCreated));
        ledger.append(TrackingLogEntry::new(other.clone(), ParcelStatus::ParcelCreated));
        ledger.append(TrackingLogEntry::new(id.clone(), ParcelStatus::ParcelPaid));
        ledger.append(TrackingLogEntry::new(id.clone(), ParcelStatus::ParcelPaid));

        let entries = ledger.list_by_tracking(&id);
        let statuses: Vec<_> = entries.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                ParcelStatus::ParcelCreated,
                ParcelStatus::ParcelPaid,
                ParcelStatus::ParcelPaid
            ]
        );
        assert_eq!(entries[1].details, "parcel paid");
        assert_eq!(ledger.len(), 4);
    }

    #[test]
    fn parcel_document_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "_id": "6f1c8a3e-2b5d-4a8e-9c1f-0d2e3f4a5b6c",
            "parcelName": "Box",
            "senderEmail": "a@x.com",
            "cost": "12.50",
            "trackingId": "PRCL-20260101-ABCDEF",
            "deliveryStatus": "parcel_created",
            "createdAt": "2026-01-01T00:00:00Z",
            "receiverDistrict": "Dhaka"
        });
        let parcel: ParcelRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(parcel.payment_status, PaymentStatus::Unpaid);
        assert_eq!(parcel.extra["receiverDistrict"], "Dhaka");

        let back = serde_json::to_value(&parcel).unwrap();
        assert_eq!(back["receiverDistrict"], "Dhaka");
        assert_eq!(back["deliveryStatus"], "parcel_created");
    }

    #[test]
    fn user_without_role_reads_as_user() {
        let raw = serde_json::json!({
            "_id": "6f1c8a3e-2b5d-4a8e-9c1f-0d2e3f4a5b6c",
            "email": "a@x.com",
            "createdAt": "2026-01-01T00:00:00Z"
        });
        let user: UserRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(user.role, Role::User);
    }
}
