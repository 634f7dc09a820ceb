//! Contract tests for FirebaseVerifier against a wiremock JWK endpoint.
//!
//! Tokens are signed with the RSA key in `fixtures/test_rsa_private.pem`;
//! `fixtures/test_jwks.json` publishes its public half under kid `test-key-1`.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zap_shift_gateway::{FirebaseConfig, FirebaseVerifier, IdentityError, IdentityVerifier};

const PROJECT: &str = "zap-shift-test";
const PRIVATE_KEY: &[u8] = include_bytes!("fixtures/test_rsa_private.pem");
const JWKS: &str = include_str!("fixtures/test_jwks.json");

#[derive(Serialize)]
struct Claims<'a> {
    sub: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    aud: &'a str,
    iss: String,
    iat: i64,
    exp: i64,
}

fn claims(email: Option<&str>) -> Claims<'_> {
    let now = chrono::Utc::now().timestamp();
    Claims {
        sub: "uid-123",
        email,
        aud: PROJECT,
        iss: format!("https://securetoken.google.com/{PROJECT}"),
        iat: now,
        exp: now + 3600,
    }
}

fn sign(claims: &Claims<'_>, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY).unwrap();
    encode(&header, claims, &key).unwrap()
}

async fn keys_server() -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/keys"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(JWKS.as_bytes().to_vec(), "application/json"),
        )
        .mount(&mock_server)
        .await;
    mock_server
}

fn verifier(mock_server: &MockServer) -> FirebaseVerifier {
    FirebaseVerifier::new(FirebaseConfig {
        project_id: PROJECT.into(),
        jwks_url: format!("{}/keys", mock_server.uri()).parse().unwrap(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn valid_token_yields_email() {
    let server = keys_server().await;
    let token = sign(&claims(Some("rider@example.com")), "test-key-1");

    let identity = verifier(&server).verify(&token).await.unwrap();
    assert_eq!(identity.email, "rider@example.com");
    assert_eq!(identity.uid, "uid-123");
}

#[tokio::test]
async fn keys_fetched_on_every_verification() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/keys"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(JWKS.as_bytes().to_vec(), "application/json"),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let v = verifier(&mock_server);
    let token = sign(&claims(Some("a@example.com")), "test-key-1");
    v.verify(&token).await.unwrap();
    v.verify(&token).await.unwrap();
}

#[tokio::test]
async fn expired_token_rejected() {
    let server = keys_server().await;
    let mut c = claims(Some("a@example.com"));
    c.iat -= 7200;
    c.exp = chrono::Utc::now().timestamp() - 3600;

    let err = verifier(&server)
        .verify(&sign(&c, "test-key-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Invalid(_)), "{err:?}");
}

#[tokio::test]
async fn wrong_audience_rejected() {
    let server = keys_server().await;
    let mut c = claims(Some("a@example.com"));
    c.aud = "some-other-project";

    let err = verifier(&server)
        .verify(&sign(&c, "test-key-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Invalid(_)), "{err:?}");
}

#[tokio::test]
async fn wrong_issuer_rejected() {
    let server = keys_server().await;
    let mut c = claims(Some("a@example.com"));
    c.iss = "https://evil.example.com".into();

    let err = verifier(&server)
        .verify(&sign(&c, "test-key-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Invalid(_)), "{err:?}");
}

#[tokio::test]
async fn unknown_kid_rejected() {
    let server = keys_server().await;
    let err = verifier(&server)
        .verify(&sign(&claims(Some("a@example.com")), "rotated-away"))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::UnknownKey(ref k) if k == "rotated-away"), "{err:?}");
}

#[tokio::test]
async fn token_without_email_rejected() {
    let server = keys_server().await;
    let err = verifier(&server)
        .verify(&sign(&claims(None), "test-key-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::MissingEmail), "{err:?}");
}

#[tokio::test]
async fn tampered_payload_rejected() {
    let server = keys_server().await;
    let token = sign(&claims(Some("a@example.com")), "test-key-1");
    let forged = sign(&claims(Some("admin@example.com")), "test-key-1");

    // Header and signature from one token, payload from another.
    let parts: Vec<&str> = token.split('.').collect();
    let forged_payload = forged.split('.').nth(1).unwrap();
    let spliced = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

    let err = verifier(&server).verify(&spliced).await.unwrap_err();
    assert!(matches!(err, IdentityError::Invalid(_)), "{err:?}");
}

#[tokio::test]
async fn key_endpoint_failure_is_upstream() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/keys"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let err = verifier(&mock_server)
        .verify(&sign(&claims(Some("a@example.com")), "test-key-1"))
        .await
        .unwrap_err();
    assert!(err.is_upstream(), "{err:?}");
}
