//! # Payments
//!
//! Checkout creation and reconciliation against the configured
//! [`PaymentGateway`](zap_shift_gateway::PaymentGateway).
//!
//! Reconciliation is keyed by the session's payment intent id. The payment
//! record is inserted first, under the store lock; the parcel update and the
//! `parcel_paid` ledger entry follow only for the call that inserted it, so a
//! replayed session changes nothing.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use zap_shift_core::{minor_units, Cost, ParcelStatus, PaymentStatus, TrackingId};
use zap_shift_gateway::{CheckoutSession, CreateSessionRequest, PaymentGateway};

use super::persist;
use crate::db::documents::Collection;
use crate::error::AppError;
use crate::extractors::Validate;
use crate::state::{AppState, InsertOutcome, PaymentRecord};

/// Body of `POST /create-checkout-session`.
///
/// Only `cost` is required. The other fields are carried through to the
/// session metadata.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub parcel_id: String,
    #[serde(default)]
    pub parcel_name: String,
    pub cost: Cost,
    #[serde(default)]
    pub sender_email: String,
    pub tracking_id: Option<String>,
}

impl Validate for CheckoutRequest {
    fn validate(&self) -> Result<(), String> {
        self.cost.value().map_err(|e| format!("cost: {e}"))?;
        Ok(())
    }
}

/// Response of `POST /create-checkout-session`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    /// Hosted payment page to redirect the payer to.
    pub url: String,
}

/// Query parameters for `PATCH /payment-success`.
#[derive(Debug, Deserialize)]
pub struct PaymentSuccessQuery {
    pub session_id: String,
}

/// Query parameters for `GET /payments`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    pub customer_email: Option<String>,
}

/// Result of [`complete_checkout`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub success: bool,
    /// Whether this call stored the payment. `false` on a replay.
    pub newly_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<TrackingId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReconcileOutcome {
    fn failed(message: &str) -> Self {
        Self {
            success: false,
            newly_created: false,
            transaction_id: None,
            tracking_id: None,
            payment: None,
            message: Some(message.to_string()),
        }
    }
}

fn gateway(state: &AppState) -> Result<Arc<dyn PaymentGateway>, AppError> {
    state.payment_gateway.clone().ok_or_else(|| {
        AppError::UpstreamUnavailable("payment gateway not configured. Set STRIPE_SECRET.".into())
    })
}

/// Start a hosted checkout for one parcel and return the payer redirect URL.
pub async fn create_checkout(
    state: &AppState,
    req: CheckoutRequest,
) -> Result<CheckoutResponse, AppError> {
    let gateway = gateway(state)?;
    let unit_amount = minor_units(&req.cost)?;
    let site = &state.config.site_domain;
    let tracking_id = match req.tracking_id.filter(|t| !t.trim().is_empty()) {
        Some(tracking_id) => tracking_id,
        None => parcel_tracking_id(state, &req.parcel_id)
            .map(|t| t.to_string())
            .unwrap_or_default(),
    };

    let session_req = CreateSessionRequest {
        parcel_id: req.parcel_id,
        parcel_name: req.parcel_name,
        unit_amount,
        customer_email: req.sender_email,
        tracking_id,
        success_url: format!(
            "{site}/dashboard/payment-success?session_id={{CHECKOUT_SESSION_ID}}"
        ),
        cancel_url: format!("{site}/dashboard/payment-cancelled"),
    };

    let session = gateway.create_session(&session_req).await?;
    tracing::info!(
        parcel_id = %session_req.parcel_id,
        session_id = %session.id,
        unit_amount,
        "checkout session created"
    );

    let url = session
        .url
        .ok_or_else(|| AppError::BadGateway("checkout session has no url".into()))?;
    Ok(CheckoutResponse { url })
}

/// Reconcile a completed checkout session into the payment and parcel records.
pub async fn complete_checkout(
    state: &AppState,
    session_id: &str,
) -> Result<ReconcileOutcome, AppError> {
    let gateway = gateway(state)?;
    let session = gateway.retrieve_session(session_id).await?;

    let Some(transaction_id) = session.payment_intent.clone() else {
        tracing::warn!(session_id, "session has no payment intent");
        return Ok(ReconcileOutcome::failed("payment not found for session"));
    };
    if !session.is_paid() {
        tracing::info!(session_id, transaction_id = %transaction_id, "session not paid");
        return Ok(ReconcileOutcome::failed("payment not completed"));
    }

    let mut record = payment_from_session(&session, transaction_id.clone());
    if record.tracking_id.as_str().is_empty() {
        if let Some(tracking_id) = parcel_tracking_id(state, &record.parcel_id) {
            record.tracking_id = tracking_id;
        }
    }
    let outcome = state.payments.insert_if_absent(record.id, record, |p| {
        p.transaction_id == transaction_id
    });

    let (payment, newly_created) = match outcome {
        InsertOutcome::Existing(payment) => {
            tracing::debug!(transaction_id = %transaction_id, "payment already reconciled");
            (payment, false)
        }
        InsertOutcome::Inserted(payment) => {
            persist(state, Collection::Payments, payment.id, &payment).await?;
            mark_parcel_paid(state, &payment).await?;
            tracing::info!(
                transaction_id = %transaction_id,
                parcel_id = %payment.parcel_id,
                tracking_id = %payment.tracking_id,
                email = %payment.customer_email,
                "payment reconciled"
            );
            (payment, true)
        }
    };

    Ok(ReconcileOutcome {
        success: true,
        newly_created,
        transaction_id: Some(transaction_id),
        tracking_id: Some(payment.tracking_id.clone()),
        payment: Some(payment),
        message: None,
    })
}

fn payment_from_session(session: &CheckoutSession, transaction_id: String) -> PaymentRecord {
    PaymentRecord {
        id: Uuid::new_v4(),
        transaction_id,
        parcel_id: session.metadata_value("parcelId").unwrap_or_default().to_string(),
        parcel_name: session.metadata_value("parcelName").map(str::to_string),
        customer_email: session.payer_email().unwrap_or_default().to_string(),
        amount: session.amount_total.unwrap_or(0) as f64 / 100.0,
        currency: session.currency.clone().unwrap_or_default(),
        payment_status: PaymentStatus::Paid,
        tracking_id: TrackingId::from_raw(session.metadata_value("trackingId").unwrap_or_default()),
        paid_at: Utc::now(),
    }
}

/// Tracking id of the parcel named by a raw id, if it parses and exists.
fn parcel_tracking_id(state: &AppState, raw_parcel_id: &str) -> Option<TrackingId> {
    let id = Uuid::parse_str(raw_parcel_id).ok()?;
    state.parcels.get(&id).map(|p| p.tracking_id)
}

/// Mark the paid parcel and log `parcel_paid` in its own stream. The status only moves when the
/// transition policy allows it; the payment flag is always set.
async fn mark_parcel_paid(state: &AppState, payment: &PaymentRecord) -> Result<(), AppError> {
    let Ok(parcel_id) = Uuid::parse_str(&payment.parcel_id) else {
        tracing::warn!(parcel_id = %payment.parcel_id, "payment references an invalid parcel id");
        return Ok(());
    };

    let policy = state.config.transition_policy;
    let mut moved = false;
    let Some(parcel) = state.parcels.update(&parcel_id, |p| {
        p.payment_status = PaymentStatus::Paid;
        if policy.check(p.delivery_status, ParcelStatus::ParcelPaid).is_ok() {
            p.delivery_status = ParcelStatus::ParcelPaid;
            moved = true;
        }
    }) else {
        tracing::warn!(parcel_id = %parcel_id, "paid parcel not found");
        return Ok(());
    };
    persist(state, Collection::Parcels, parcel.id, &parcel).await?;

    if moved {
        super::ledger::append(state, &parcel.tracking_id, ParcelStatus::ParcelPaid).await?;
    } else {
        tracing::warn!(
            parcel_id = %parcel_id,
            status = %parcel.delivery_status,
            "paid parcel status left unchanged"
        );
    }
    Ok(())
}

/// Payments for one customer, most recent first.
///
/// `requested` defaults to the caller's own email; asking for anyone else's
/// payments is forbidden.
pub fn list(
    state: &AppState,
    caller_email: &str,
    requested: Option<&str>,
) -> Result<Vec<PaymentRecord>, AppError> {
    let email = requested.unwrap_or(caller_email);
    if email != caller_email {
        tracing::warn!(caller = %caller_email, requested = %email, "payment listing for another customer");
        return Err(AppError::Forbidden("forbidden access".into()));
    }
    let mut payments = state.payments.filter(|p| p.customer_email == email);
    payments.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
    Ok(payments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use zap_shift_gateway::checkout::{CustomerDetails, SessionPaymentStatus};
    use zap_shift_gateway::GatewayError;

    use crate::repo::parcels::{self, NewParcel};
    use crate::state::Extra;

    #[derive(Debug, Default)]
    struct FakeGateway {
        created: Mutex<Vec<CreateSessionRequest>>,
        session: Mutex<Option<CheckoutSession>>,
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_session(
            &self,
            req: &CreateSessionRequest,
        ) -> Result<CheckoutSession, GatewayError> {
            self.created.lock().push(req.clone());
            Ok(session("cs_1", None, SessionPaymentStatus::Unpaid, HashMap::new()))
        }

        async fn retrieve_session(&self, _id: &str) -> Result<CheckoutSession, GatewayError> {
            Ok(self.session.lock().clone().unwrap_or_else(|| {
                session("cs_1", None, SessionPaymentStatus::Unpaid, HashMap::new())
            }))
        }
    }

    fn session(
        id: &str,
        intent: Option<&str>,
        status: SessionPaymentStatus,
        metadata: HashMap<String, String>,
    ) -> CheckoutSession {
        CheckoutSession {
            id: id.into(),
            url: Some(format!("https://pay.example/{id}")),
            payment_intent: intent.map(str::to_string),
            payment_status: status,
            amount_total: Some(1250),
            currency: Some("usd".into()),
            customer_email: Some("a@x.com".into()),
            customer_details: Some(CustomerDetails {
                email: Some("a@x.com".into()),
            }),
            metadata,
        }
    }

    async fn paid_setup() -> (AppState, Arc<FakeGateway>, Uuid, TrackingId) {
        let fake = Arc::new(FakeGateway::default());
        let state = AppState::new().with_payment_gateway(fake.clone());
        let created = parcels::create(
            &state,
            NewParcel {
                parcel_name: Some("Box".into()),
                sender_email: Some("a@x.com".into()),
                cost: Some(Cost::Text("12.50".into())),
                extra: Extra::new(),
            },
        )
        .await
        .unwrap();
        let parcel_id = created.result.inserted_id.unwrap();

        let metadata = HashMap::from([
            ("parcelId".to_string(), parcel_id.to_string()),
            ("parcelName".to_string(), "Box".to_string()),
            ("trackingId".to_string(), created.tracking_id.to_string()),
        ]);
        *fake.session.lock() = Some(session(
            "cs_1",
            Some("pi_1"),
            SessionPaymentStatus::Paid,
            metadata,
        ));
        (state, fake, parcel_id, created.tracking_id)
    }

    #[tokio::test]
    async fn checkout_converts_cost_and_builds_urls() {
        let fake = Arc::new(FakeGateway::default());
        let state = AppState::new().with_payment_gateway(fake.clone());

        let resp = create_checkout(
            &state,
            CheckoutRequest {
                parcel_id: "p1".into(),
                parcel_name: "Box".into(),
                cost: Cost::Text("12.50".into()),
                sender_email: "a@x.com".into(),
                tracking_id: Some("PRCL-20260101-ABCDEF".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(resp.url, "https://pay.example/cs_1");

        let sent = fake.created.lock()[0].clone();
        assert_eq!(sent.unit_amount, 1250);
        assert_eq!(
            sent.success_url,
            "http://localhost:5173/dashboard/payment-success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(sent.cancel_url, "http://localhost:5173/dashboard/payment-cancelled");
    }

    #[tokio::test]
    async fn checkout_accepts_cost_only_body() {
        let fake = Arc::new(FakeGateway::default());
        let state = AppState::new().with_payment_gateway(fake.clone());

        let req: CheckoutRequest =
            serde_json::from_value(serde_json::json!({"cost": "12.50", "parcelName": "Box"}))
                .unwrap();
        assert!(req.validate().is_ok());
        create_checkout(&state, req).await.unwrap();

        let sent = fake.created.lock()[0].clone();
        assert_eq!(sent.unit_amount, 1250);
        assert_eq!(sent.parcel_name, "Box");
        assert!(sent.customer_email.is_empty());
        assert!(sent.tracking_id.is_empty());
    }

    #[tokio::test]
    async fn checkout_fills_tracking_id_from_parcel() {
        let (state, fake, parcel_id, tracking_id) = paid_setup().await;
        create_checkout(
            &state,
            CheckoutRequest {
                parcel_id: parcel_id.to_string(),
                parcel_name: "Box".into(),
                cost: Cost::Number(10.0),
                sender_email: "a@x.com".into(),
                tracking_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(fake.created.lock()[0].tracking_id, tracking_id.as_str());
    }

    #[tokio::test]
    async fn paid_entry_lands_in_parcel_stream_without_metadata_tracking_id() {
        let (state, fake, parcel_id, tracking_id) = paid_setup().await;
        if let Some(s) = fake.session.lock().as_mut() {
            s.metadata.remove("trackingId");
        }

        let outcome = complete_checkout(&state, "cs_1").await.unwrap();
        assert!(outcome.newly_created);
        assert_eq!(outcome.payment.unwrap().tracking_id, tracking_id);

        let statuses: Vec<ParcelStatus> = state
            .tracking
            .list_by_tracking(&tracking_id)
            .into_iter()
            .map(|e| e.status)
            .collect();
        assert_eq!(statuses, vec![ParcelStatus::ParcelCreated, ParcelStatus::ParcelPaid]);
        assert!(state.tracking.list_by_tracking(&TrackingId::from_raw("")).is_empty());
        assert_eq!(
            state.parcels.get(&parcel_id).unwrap().delivery_status,
            ParcelStatus::ParcelPaid
        );
    }

    #[tokio::test]
    async fn unconfigured_gateway_is_unavailable() {
        let state = AppState::new();
        let err = complete_checkout(&state, "cs_1").await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn replayed_session_reconciles_once() {
        let (state, _fake, parcel_id, tracking_id) = paid_setup().await;

        let first = complete_checkout(&state, "cs_1").await.unwrap();
        assert!(first.success && first.newly_created);
        assert_eq!(first.payment.as_ref().unwrap().amount, 12.5);

        let second = complete_checkout(&state, "cs_1").await.unwrap();
        assert!(second.success && !second.newly_created);
        assert_eq!(second.payment.unwrap().id, first.payment.unwrap().id);

        assert_eq!(state.payments.len(), 1);
        let paid_entries = state
            .tracking
            .list_by_tracking(&tracking_id)
            .into_iter()
            .filter(|e| e.status == ParcelStatus::ParcelPaid)
            .count();
        assert_eq!(paid_entries, 1);

        let parcel = state.parcels.get(&parcel_id).unwrap();
        assert_eq!(parcel.delivery_status, ParcelStatus::ParcelPaid);
        assert_eq!(parcel.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn unpaid_session_changes_nothing() {
        let (state, fake, parcel_id, _) = paid_setup().await;
        if let Some(s) = fake.session.lock().as_mut() {
            s.payment_status = SessionPaymentStatus::Unpaid;
        }

        let outcome = complete_checkout(&state, "cs_1").await.unwrap();
        assert!(!outcome.success);
        assert!(state.payments.is_empty());
        assert_eq!(
            state.parcels.get(&parcel_id).unwrap().delivery_status,
            ParcelStatus::ParcelCreated
        );
    }

    #[tokio::test]
    async fn session_without_intent_fails() {
        let (state, fake, _, _) = paid_setup().await;
        if let Some(s) = fake.session.lock().as_mut() {
            s.payment_intent = None;
        }
        let outcome = complete_checkout(&state, "cs_1").await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.is_some());
        assert!(state.payments.is_empty());
    }

    #[tokio::test]
    async fn listing_is_scoped_to_caller() {
        let (state, _fake, _, _) = paid_setup().await;
        complete_checkout(&state, "cs_1").await.unwrap();

        assert_eq!(list(&state, "a@x.com", None).unwrap().len(), 1);
        assert_eq!(list(&state, "a@x.com", Some("a@x.com")).unwrap().len(), 1);
        assert!(matches!(
            list(&state, "a@x.com", Some("b@x.com")),
            Err(AppError::Forbidden(_))
        ));
    }
}
