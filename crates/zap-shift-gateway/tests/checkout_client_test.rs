//! Contract tests for StripeClient against a wiremock checkout API.
//!
//! ## Endpoints Tested
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | POST   | `/v1/checkout/sessions` | `create_session_*` |
//! | GET    | `/v1/checkout/sessions/{id}` | `retrieve_session_*` |

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zap_shift_gateway::checkout::SessionPaymentStatus;
use zap_shift_gateway::{CreateSessionRequest, GatewayError, PaymentGateway, StripeClient, StripeConfig};

fn test_client(mock_server: &MockServer) -> StripeClient {
    StripeClient::new(StripeConfig {
        api_base: mock_server.uri().parse().unwrap(),
        secret_key: zeroize::Zeroizing::new("sk_test_123".into()),
        currency: "usd".into(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn parcel_request() -> CreateSessionRequest {
    CreateSessionRequest {
        parcel_id: "65f0c0ffee".into(),
        parcel_name: "Documents".into(),
        unit_amount: 1250,
        customer_email: "sender@example.com".into(),
        tracking_id: "PRCL-20260301-0A1B2C".into(),
        success_url: "http://localhost:5173/dashboard/payment-success?session_id={CHECKOUT_SESSION_ID}"
            .into(),
        cancel_url: "http://localhost:5173/dashboard/payment-cancelled".into(),
    }
}

// ── POST /v1/checkout/sessions ───────────────────────────────────────

#[tokio::test]
async fn create_session_posts_form_and_returns_redirect_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("mode=payment"))
        .and(body_string_contains("line_items%5B0%5D%5Bprice_data%5D%5Bunit_amount%5D=1250"))
        .and(body_string_contains("metadata%5BparcelId%5D=65f0c0ffee"))
        .and(body_string_contains("metadata%5BtrackingId%5D=PRCL-20260301-0A1B2C"))
        .and(body_string_contains("customer_email=sender%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cs_test_a1",
            "object": "checkout.session",
            "url": "https://checkout.stripe.com/c/pay/cs_test_a1",
            "payment_status": "unpaid",
            "payment_intent": null,
            "amount_total": 1250,
            "currency": "usd",
            "metadata": {
                "parcelId": "65f0c0ffee",
                "parcelName": "Documents",
                "trackingId": "PRCL-20260301-0A1B2C"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = test_client(&mock_server)
        .create_session(&parcel_request())
        .await
        .unwrap();
    assert_eq!(session.id, "cs_test_a1");
    assert_eq!(
        session.url.as_deref(),
        Some("https://checkout.stripe.com/c/pay/cs_test_a1")
    );
    assert_eq!(session.payment_status, SessionPaymentStatus::Unpaid);
    assert_eq!(session.metadata_value("parcelName"), Some("Documents"));
}

#[tokio::test]
async fn create_session_surfaces_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            r#"{"error":{"message":"Invalid integer: abc","type":"invalid_request_error"}}"#,
        ))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .create_session(&parcel_request())
        .await
        .unwrap_err();
    match err {
        GatewayError::Api { status, body, .. } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_request_error"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn create_session_rejects_non_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .create_session(&parcel_request())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Deserialization { .. }), "{err:?}");
}

// ── GET /v1/checkout/sessions/{id} ───────────────────────────────────

#[tokio::test]
async fn retrieve_session_returns_paid_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_test_a1"))
        .and(header("authorization", "Bearer sk_test_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cs_test_a1",
            "payment_status": "paid",
            "payment_intent": "pi_3Nabc",
            "amount_total": 1250,
            "currency": "usd",
            "customer_email": "sender@example.com",
            "metadata": {
                "parcelId": "65f0c0ffee",
                "parcelName": "Documents",
                "trackingId": "PRCL-20260301-0A1B2C"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = test_client(&mock_server)
        .retrieve_session("cs_test_a1")
        .await
        .unwrap();
    assert!(session.is_paid());
    assert_eq!(session.payment_intent.as_deref(), Some("pi_3Nabc"));
    assert_eq!(session.amount_total, Some(1250));
    assert_eq!(session.payer_email(), Some("sender@example.com"));
    assert_eq!(session.metadata_value("parcelId"), Some("65f0c0ffee"));
}

#[tokio::test]
async fn retrieve_session_handles_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            r#"{"error":{"message":"No such checkout.session: 'cs_missing'"}}"#,
        ))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .retrieve_session("cs_missing")
        .await
        .unwrap_err();
    assert!(
        matches!(err, GatewayError::Api { status: 404, .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn unreachable_gateway_is_http_error() {
    let client = StripeClient::new(StripeConfig {
        api_base: "http://127.0.0.1:1".parse().unwrap(),
        secret_key: zeroize::Zeroizing::new("sk_test_123".into()),
        currency: "usd".into(),
        timeout_secs: 2,
    })
    .unwrap();

    let err = client.retrieve_session("cs_test_a1").await.unwrap_err();
    assert!(matches!(err, GatewayError::Http { .. }), "{err:?}");
}
