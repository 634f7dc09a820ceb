//! Gateway error types.

/// Errors from payment gateway calls.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The gateway returned a non-2xx status.
    #[error("gateway {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

/// Errors from ID token verification. All of them mean "not authenticated".
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The token is not a decodable JWT.
    #[error("malformed token: {0}")]
    MalformedToken(String),
    /// The token's `kid` is not in the published key set.
    #[error("unknown signing key: {0}")]
    UnknownKey(String),
    /// Signature, audience, issuer or expiry check failed.
    #[error("token rejected: {0}")]
    Invalid(String),
    /// A valid token without an `email` claim.
    #[error("token carries no email claim")]
    MissingEmail,
    /// The key set could not be fetched or parsed.
    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

impl IdentityError {
    /// Whether the failure is on the provider side rather than the token's.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::KeyFetch(_))
    }
}
