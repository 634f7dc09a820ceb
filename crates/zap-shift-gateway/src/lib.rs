//! # zap-shift-gateway -- Typed clients for external services
//!
//! Zap Shift depends on two hosted services:
//! - **Payments** via a Stripe-style checkout-session API ([`checkout`]).
//! - **Identity** via Firebase-style ID tokens verified against a published
//!   JWK set ([`identity`]).
//!
//! ## Architecture
//!
//! Each service sits behind a trait ([`PaymentGateway`], [`IdentityVerifier`])
//! so the API layer can be exercised with in-process fakes. The concrete
//! clients make exactly one outbound call per operation: no caching and no
//! retries.

pub mod checkout;
pub mod config;
pub mod error;
pub mod identity;

pub use checkout::{CheckoutSession, CreateSessionRequest, PaymentGateway, StripeClient};
pub use config::{ConfigError, FirebaseConfig, StripeConfig};
pub use error::{GatewayError, IdentityError};
pub use identity::{FirebaseVerifier, IdentityVerifier, VerifiedIdentity};

use std::time::Duration;

/// Build the shared HTTP client used by both gateway clients.
pub(crate) fn http_client(
    timeout_secs: u64,
    headers: reqwest::header::HeaderMap,
) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(headers)
        .build()
        .map_err(|e| GatewayError::Http {
            endpoint: "client_init".into(),
            source: e,
        })
}
