//! Gateway client configuration.
//!
//! Defaults point to the production endpoints. Override via environment
//! variables or explicit construction for staging and tests.

use url::Url;
use zeroize::Zeroizing;

/// Default Google endpoint publishing the Firebase ID token signing keys.
pub const DEFAULT_FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Configuration for the hosted checkout API.
///
/// Custom `Debug` implementation redacts the `secret_key` field.
#[derive(Clone)]
pub struct StripeConfig {
    /// Base URL of the payments API. Default: <https://api.stripe.com>
    pub api_base: Url,
    /// Secret API key, sent as a bearer token.
    pub secret_key: Zeroizing<String>,
    /// ISO currency code for checkout line items.
    pub currency: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .field("currency", &self.currency)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `STRIPE_SECRET` (required)
    /// - `STRIPE_API_BASE` (default: `https://api.stripe.com`)
    /// - `PAYMENT_CURRENCY` (default: `usd`)
    /// - `GATEWAY_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret_key =
            std::env::var("STRIPE_SECRET").map_err(|_| ConfigError::MissingVar("STRIPE_SECRET"))?;

        Ok(Self {
            api_base: env_url("STRIPE_API_BASE", "https://api.stripe.com")?,
            secret_key: Zeroizing::new(secret_key),
            currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            timeout_secs: timeout_from_env(),
        })
    }
}

/// Configuration for ID token verification.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Project identifier: the expected token audience.
    pub project_id: String,
    /// URL of the JWK set used to verify token signatures.
    pub jwks_url: Url,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl FirebaseConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `FIREBASE_PROJECT_ID` (required)
    /// - `FIREBASE_JWKS_URL` (default: Google securetoken JWK endpoint)
    /// - `GATEWAY_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_id = std::env::var("FIREBASE_PROJECT_ID")
            .map_err(|_| ConfigError::MissingVar("FIREBASE_PROJECT_ID"))?;

        Ok(Self {
            project_id,
            jwks_url: env_url("FIREBASE_JWKS_URL", DEFAULT_FIREBASE_JWKS_URL)?,
            timeout_secs: timeout_from_env(),
        })
    }

    /// Expected `iss` claim for this project.
    pub fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }
}

fn timeout_from_env() -> u64 {
    std::env::var("GATEWAY_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30)
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("ZAP_NONEXISTENT_VAR_12345", "https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn env_url_rejects_invalid_url() {
        std::env::set_var("ZAP_TEST_BAD_URL", "not a url");
        let result = env_url("ZAP_TEST_BAD_URL", "https://example.com");
        std::env::remove_var("ZAP_TEST_BAD_URL");
        assert!(result.is_err());
    }

    #[test]
    fn stripe_debug_redacts_secret() {
        let cfg = StripeConfig {
            api_base: Url::parse("https://api.stripe.com").unwrap(),
            secret_key: Zeroizing::new("sk_test_very_secret".into()),
            currency: "usd".into(),
            timeout_secs: 5,
        };
        let debug = format!("{cfg:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk_test_very_secret"));
    }

    #[test]
    fn firebase_issuer_derived_from_project() {
        let cfg = FirebaseConfig {
            project_id: "zap-shift-dev".into(),
            jwks_url: Url::parse(DEFAULT_FIREBASE_JWKS_URL).unwrap(),
            timeout_secs: 5,
        };
        assert_eq!(cfg.issuer(), "https://securetoken.google.com/zap-shift-dev");
    }
}
