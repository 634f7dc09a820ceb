//! Typed client for the hosted checkout API (Stripe-style).
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/v1/checkout/sessions` | Create a checkout session (form-encoded) |
//! | GET    | `/v1/checkout/sessions/{id}` | Retrieve a session |
//!
//! Requests authenticate with the secret key as a bearer token.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ConfigError, StripeConfig};
use crate::error::GatewayError;

const SESSIONS_PATH: &str = "v1/checkout/sessions";

// -- Trait --------------------------------------------------------------------

/// Hosted payment collection.
#[async_trait]
pub trait PaymentGateway: Send + Sync + std::fmt::Debug {
    /// Create a checkout session and return it (including the payer redirect URL).
    async fn create_session(
        &self,
        req: &CreateSessionRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Fetch the current state of a session.
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, GatewayError>;
}

// -- Request/Response types ---------------------------------------------------

/// Parameters for a single-item parcel checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSessionRequest {
    pub parcel_id: String,
    pub parcel_name: String,
    /// Amount in minor currency units.
    pub unit_amount: i64,
    pub customer_email: String,
    pub tracking_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl CreateSessionRequest {
    /// Flatten into the bracketed form fields the checkout API expects.
    ///
    /// An empty `customer_email` is left out; the hosted page then asks the
    /// payer for it.
    pub fn form_fields(&self, currency: &str) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("line_items[0][price_data][currency]", currency.to_string()),
            ("line_items[0][price_data][unit_amount]", self.unit_amount.to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                format!("Please pay for: {}", self.parcel_name),
            ),
            ("line_items[0][quantity]", "1".to_string()),
            ("mode", "payment".to_string()),
            ("customer_email", self.customer_email.clone()),
            ("metadata[parcelId]", self.parcel_id.clone()),
            ("metadata[parcelName]", self.parcel_name.clone()),
            ("metadata[trackingId]", self.tracking_id.clone()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
        ];
        fields.retain(|(key, value)| *key != "customer_email" || !value.trim().is_empty());
        fields
    }
}

/// Payment state reported on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPaymentStatus {
    Paid,
    #[default]
    Unpaid,
    NoPaymentRequired,
    /// Forward-compatible catch-all.
    #[serde(other)]
    Unknown,
}

/// Payer details attached to a completed session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

/// A checkout session as returned by the gateway.
///
/// Fields use `#[serde(default)]`; unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Redirect URL for the payer's browser (present while the session is open).
    #[serde(default)]
    pub url: Option<String>,
    /// Payment intent identifier; the transaction id once payment is captured.
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub payment_status: SessionPaymentStatus,
    /// Total in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Whether the payer completed payment.
    pub fn is_paid(&self) -> bool {
        self.payment_status == SessionPaymentStatus::Paid
    }

    /// Payer email, preferring the address the session was created with.
    pub fn payer_email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or_else(|| self.customer_details.as_ref()?.email.as_deref())
    }

    /// Metadata value attached at creation.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

// -- Client -------------------------------------------------------------------

/// Client for the hosted checkout API.
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    base_url: Url,
    currency: String,
}

impl StripeClient {
    /// Create a client from configuration.
    pub fn new(config: StripeConfig) -> Result<Self, GatewayError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.secret_key.as_str()))
                .map_err(|_| {
                    ConfigError::InvalidValue("STRIPE_SECRET", "not a valid header value".into())
                })?,
        );
        let http = crate::http_client(config.timeout_secs, headers)?;

        Ok(Self {
            http,
            base_url: config.api_base,
            currency: config.currency,
        })
    }

    fn session_url(&self, session_id: Option<&str>) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ConfigError::InvalidUrl("STRIPE_API_BASE".into(), "cannot be a base URL".into())
            })?;
            segments.pop_if_empty().extend(SESSIONS_PATH.split('/'));
            if let Some(id) = session_id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    /// Calls `POST {base_url}/v1/checkout/sessions`.
    async fn create_session(
        &self,
        req: &CreateSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let endpoint = "POST /checkout/sessions";
        let url = self.session_url(None)?;

        let resp = self
            .http
            .post(url)
            .form(&req.form_fields(&self.currency))
            .send()
            .await
            .map_err(|e| GatewayError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        resp.json().await.map_err(|e| GatewayError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
    }

    /// Calls `GET {base_url}/v1/checkout/sessions/{id}`.
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, GatewayError> {
        let endpoint = format!("GET /checkout/sessions/{session_id}");
        let url = self.session_url(Some(session_id))?;

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                endpoint,
                status,
                body,
            });
        }

        resp.json().await.map_err(|e| GatewayError::Deserialization {
            endpoint,
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeroize::Zeroizing;

    fn client(base: &str) -> StripeClient {
        StripeClient::new(StripeConfig {
            api_base: Url::parse(base).unwrap(),
            secret_key: Zeroizing::new("sk_test".into()),
            currency: "usd".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn session_url_joins_path() {
        let c = client("https://api.stripe.com");
        assert_eq!(
            c.session_url(None).unwrap().as_str(),
            "https://api.stripe.com/v1/checkout/sessions"
        );
        assert_eq!(
            c.session_url(Some("cs_test_123")).unwrap().as_str(),
            "https://api.stripe.com/v1/checkout/sessions/cs_test_123"
        );
    }

    #[test]
    fn session_id_is_percent_encoded() {
        let c = client("http://127.0.0.1:9999/");
        let url = c.session_url(Some("../v1/customers")).unwrap();
        assert!(url.path().ends_with("/sessions/..%2Fv1%2Fcustomers"), "{url}");
    }

    #[test]
    fn form_fields_carry_amount_and_metadata() {
        let req = CreateSessionRequest {
            parcel_id: "p1".into(),
            parcel_name: "Box".into(),
            unit_amount: 1250,
            customer_email: "a@x.com".into(),
            tracking_id: "PRCL-20260101-ABCDEF".into(),
            success_url: "https://site/ok".into(),
            cancel_url: "https://site/cancel".into(),
        };
        let fields: HashMap<_, _> = req.form_fields("usd").into_iter().collect();
        assert_eq!(fields["line_items[0][price_data][unit_amount]"], "1250");
        assert_eq!(fields["line_items[0][price_data][currency]"], "usd");
        assert_eq!(fields["mode"], "payment");
        assert_eq!(fields["metadata[parcelId]"], "p1");
        assert_eq!(fields["metadata[trackingId]"], "PRCL-20260101-ABCDEF");
        assert_eq!(
            fields["line_items[0][price_data][product_data][name]"],
            "Please pay for: Box"
        );
    }

    #[test]
    fn empty_customer_email_is_omitted() {
        let req = CreateSessionRequest {
            parcel_id: String::new(),
            parcel_name: "Box".into(),
            unit_amount: 1250,
            customer_email: String::new(),
            tracking_id: String::new(),
            success_url: "https://site/ok".into(),
            cancel_url: "https://site/cancel".into(),
        };
        let fields = req.form_fields("usd");
        assert!(fields.iter().all(|(k, _)| *k != "customer_email"));
        assert!(fields.iter().any(|(k, v)| *k == "metadata[parcelName]" && v == "Box"));
    }

    #[test]
    fn session_deserializes_minimal_body() {
        let session: CheckoutSession =
            serde_json::from_value(serde_json::json!({ "id": "cs_1" })).unwrap();
        assert_eq!(session.payment_status, SessionPaymentStatus::Unpaid);
        assert!(session.payment_intent.is_none());
        assert!(!session.is_paid());
    }

    #[test]
    fn payer_email_falls_back_to_customer_details() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "payment_status": "paid",
            "customer_email": null,
            "customer_details": { "email": "payer@x.com" }
        }))
        .unwrap();
        assert!(session.is_paid());
        assert_eq!(session.payer_email(), Some("payer@x.com"));
    }

    #[test]
    fn unknown_payment_status_tolerated() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "payment_status": "partially_refunded"
        }))
        .unwrap();
        assert_eq!(session.payment_status, SessionPaymentStatus::Unknown);
    }
}
