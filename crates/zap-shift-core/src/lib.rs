#![deny(missing_docs)]

//! # zap-shift-core: Domain Primitives for Zap Shift
//!
//! Foundational types shared by the gateway clients and the API service.
//! No I/O lives here: only `serde`, `thiserror`, `chrono` and `rand_core`
//! from the external ecosystem.
//!
//! ## Contents
//!
//! - [`ParcelStatus`] and [`TransitionPolicy`]: the parcel lifecycle as an
//!   explicit state machine with a transition table.
//! - [`TrackingId`]: `PRCL-<YYYYMMDD>-<6 hex>` identifiers naming a parcel's
//!   event stream.
//! - [`Role`], [`RiderStatus`], [`WorkStatus`], [`PaymentStatus`]: closed
//!   string-valued enums persisted on user, rider and parcel records.
//! - [`minor_units`]: checkout amount conversion.

pub mod error;
pub mod money;
pub mod status;
pub mod tracking;

pub use error::CoreError;
pub use money::{minor_units, Cost};
pub use status::{
    ParcelStatus, PaymentStatus, RiderStatus, Role, TransitionPolicy, WorkStatus,
};
pub use tracking::TrackingId;
