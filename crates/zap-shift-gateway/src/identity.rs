//! ID token verification.
//!
//! Callers present a Firebase-style ID token (RS256 JWT). The verifier checks
//! the signature against the provider's published JWK set, then the audience,
//! issuer and expiry, and yields the caller's email.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use url::Url;

use crate::config::FirebaseConfig;
use crate::error::{GatewayError, IdentityError};

/// The authenticated subject of a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Provider user id (`sub`).
    pub uid: String,
    pub email: String,
}

/// Turns a bearer token into a verified identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + std::fmt::Debug {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies Firebase ID tokens against the published signing keys.
///
/// The key set is fetched on every verification.
#[derive(Debug, Clone)]
pub struct FirebaseVerifier {
    http: reqwest::Client,
    jwks_url: Url,
    validation: Validation,
}

impl FirebaseVerifier {
    pub fn new(config: FirebaseConfig) -> Result<Self, GatewayError> {
        let http = crate::http_client(config.timeout_secs, reqwest::header::HeaderMap::new())?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[config.project_id.as_str()]);
        validation.set_issuer(&[config.issuer()]);

        Ok(Self {
            http,
            jwks_url: config.jwks_url,
            validation,
        })
    }

    async fn fetch_keys(&self) -> Result<JwkSet, IdentityError> {
        let resp = self
            .http
            .get(self.jwks_url.clone())
            .send()
            .await
            .map_err(|e| IdentityError::KeyFetch(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(IdentityError::KeyFetch(format!(
                "key endpoint returned {}",
                resp.status().as_u16()
            )));
        }

        resp.json::<JwkSet>()
            .await
            .map_err(|e| IdentityError::KeyFetch(e.to_string()))
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let header =
            decode_header(token).map_err(|e| IdentityError::MalformedToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::Invalid(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::MalformedToken("missing kid".into()))?;

        let keys = self.fetch_keys().await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| IdentityError::UnknownKey(kid.clone()))?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| IdentityError::KeyFetch(e.to_string()))?;

        let data = decode::<IdTokenClaims>(token, &key, &self.validation)
            .map_err(|e| IdentityError::Invalid(e.to_string()))?;

        let email = data
            .claims
            .email
            .filter(|e| !e.is_empty())
            .ok_or(IdentityError::MissingEmail)?;

        tracing::debug!(uid = %data.claims.sub, email = %email, "ID token verified");

        Ok(VerifiedIdentity {
            uid: data.claims.sub,
            email,
        })
    }
}
