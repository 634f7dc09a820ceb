//! # zap-shift-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `PORT` (default 3000).

use std::sync::Arc;

use zap_shift_api::state::{AppConfig, AppState};
use zap_shift_gateway::{FirebaseConfig, FirebaseVerifier, StripeClient, StripeConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    let port = config.port;
    tracing::info!(
        transitions = %config.transition_policy,
        rider_filter = %config.rider_filter,
        site_domain = %config.site_domain,
        "Configuration loaded"
    );

    // Initialize database pool (optional, absent means in-memory only).
    let db_pool = zap_shift_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let mut state = AppState::with_config(config).with_db(db_pool);

    match StripeConfig::from_env() {
        Ok(stripe_config) => {
            let client = StripeClient::new(stripe_config)?;
            tracing::info!("Payment gateway configured");
            state = state.with_payment_gateway(Arc::new(client));
        }
        Err(e) => {
            tracing::warn!("Payment gateway not configured: {e}. Checkout endpoints will return 503.");
        }
    }

    match FirebaseConfig::from_env() {
        Ok(firebase_config) => {
            let verifier = FirebaseVerifier::new(firebase_config)?;
            tracing::info!("Identity verifier configured");
            state = state.with_identity(Arc::new(verifier));
        }
        Err(e) => {
            tracing::warn!(
                "Identity verifier not configured: {e}. Protected endpoints will return 503."
            );
        }
    }

    // Hydrate in-memory stores from database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    let app = zap_shift_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Zap Shift API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` filter (default `info`); `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
