//! # Middleware
//!
//! Tower middleware for the API service:
//! - [`tracing_layer`]: request/response spans via `TraceLayer`.
//! - [`metrics`]: in-process request and error counters.
//!
//! Bearer authentication lives in [`crate::auth`] and is layered onto the
//! protected routers only.

pub mod metrics;
pub mod tracing_layer;
