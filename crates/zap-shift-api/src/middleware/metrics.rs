//! # Request Metrics
//!
//! Atomic request counters shared through a request extension and served as
//! a JSON snapshot at `GET /metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Shared metrics state.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
}

/// Point-in-time view of [`ApiMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finished request with the given status code.
    pub fn record(&self, status: u16) {
        self.inner.requests.fetch_add(1, Ordering::Relaxed);
        match status {
            400..=499 => {
                self.inner.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            500..=599 => {
                self.inner.server_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn requests(&self) -> u64 {
        self.inner.requests.load(Ordering::Relaxed)
    }

    /// Client and server errors combined.
    pub fn errors(&self) -> u64 {
        self.inner.client_errors.load(Ordering::Relaxed)
            + self.inner.server_errors.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests(),
            client_errors: self.inner.client_errors.load(Ordering::Relaxed),
            server_errors: self.inner.server_errors.load(Ordering::Relaxed),
        }
    }
}

/// Middleware that counts every response passing through it.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record(response.status().as_u16());
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn errors_split_by_class() {
        let m = ApiMetrics::new();
        m.record(200);
        m.record(404);
        m.record(403);
        m.record(503);
        assert_eq!(
            m.snapshot(),
            MetricsSnapshot {
                requests: 4,
                client_errors: 2,
                server_errors: 1,
            }
        );
        assert_eq!(m.errors(), 3);
    }

    #[test]
    fn clones_share_counters() {
        let m = ApiMetrics::new();
        let other = m.clone();
        other.record(500);
        assert_eq!(m.requests(), 1);
    }
}
