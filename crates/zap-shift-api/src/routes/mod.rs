//! # API Route Modules
//!
//! Each module exposes a `router()` with its open routes and, where it has
//! any, a `protected_router()` whose routes require a verified bearer token.
//! Protected methods are wrapped with [`crate::auth::require_bearer`].
//!
//! - `parcels`: parcel CRUD, rider assignment, status updates, stats.
//! - `riders`: rider applications, approval, delivery statistics.
//! - `users`: sign-in registration, search, role management.
//! - `payments`: hosted checkout and reconciliation.
//! - `tracking`: tracking ledger reads.

pub mod parcels;
pub mod payments;
pub mod riders;
pub mod tracking;
pub mod users;
