//! # Lifecycle Status Enums
//!
//! Closed, string-valued enums stored on parcel, rider and user records.
//! Wire and storage representations are the snake_case tokens returned by
//! each `as_str()`.
//!
//! ## Parcel Transition Graph
//!
//! ```text
//! parcel_created ──pay──▶ parcel_paid ──assign──▶ driver_assigned
//!                              ▲                        │
//!                              └────────decline─────────┤
//!                                                       ├──▶ rider_arriving ──┐
//!                                                       │                     ▼
//!                                                       └──────────────▶ parcel_picked_up
//!                                                                             │
//!                                                                             ▼
//!                                                                      parcel_delivered
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::CoreError;

/// Implements `as_str`, `Display` and `FromStr` for a unit-only enum from a
/// single variant/token table.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $token:literal),+ $(,)? }) => {
        impl $name {
            /// Return the canonical string token.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok(Self::$variant),)+
                    other => Err(CoreError::UnknownValue {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

// ── Parcel ──────────────────────────────────────────────────────────────────

/// Delivery status of a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    /// Sender created the parcel; not yet paid.
    ParcelCreated,
    /// Checkout completed; waiting for a rider.
    ParcelPaid,
    /// A rider has been assigned.
    DriverAssigned,
    /// Rider accepted and is heading to the pickup point.
    RiderArriving,
    /// Rider collected the parcel.
    ParcelPickedUp,
    /// Delivered to the recipient. Terminal.
    ParcelDelivered,
}

string_enum!(ParcelStatus, "parcel status", {
    ParcelCreated => "parcel_created",
    ParcelPaid => "parcel_paid",
    DriverAssigned => "driver_assigned",
    RiderArriving => "rider_arriving",
    ParcelPickedUp => "parcel_picked_up",
    ParcelDelivered => "parcel_delivered",
});

impl ParcelStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [ParcelStatus; 6] = [
        Self::ParcelCreated,
        Self::ParcelPaid,
        Self::DriverAssigned,
        Self::RiderArriving,
        Self::ParcelPickedUp,
        Self::ParcelDelivered,
    ];

    /// Valid target states from this state.
    pub fn valid_transitions(&self) -> &'static [ParcelStatus] {
        match self {
            Self::ParcelCreated => &[Self::ParcelPaid],
            Self::ParcelPaid => &[Self::DriverAssigned],
            Self::DriverAssigned => &[Self::RiderArriving, Self::ParcelPickedUp, Self::ParcelPaid],
            Self::RiderArriving => &[Self::ParcelPickedUp],
            Self::ParcelPickedUp => &[Self::ParcelDelivered],
            Self::ParcelDelivered => &[],
        }
    }

    /// Whether no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Whether `next` is reachable in one step from this state.
    pub fn can_transition_to(&self, next: ParcelStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Human-readable ledger text: the token with underscores as spaces.
    pub fn details(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

/// How status changes are checked against the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Reject anything outside [`ParcelStatus::valid_transitions`].
    #[default]
    Strict,
    /// Accept any overwrite, including no-op and backwards moves.
    Permissive,
}

string_enum!(TransitionPolicy, "transition policy", {
    Strict => "strict",
    Permissive => "permissive",
});

impl TransitionPolicy {
    /// Validate `from → to` under this policy.
    pub fn check(&self, from: ParcelStatus, to: ParcelStatus) -> Result<(), CoreError> {
        match self {
            Self::Permissive => Ok(()),
            Self::Strict if from.can_transition_to(to) => Ok(()),
            Self::Strict => Err(CoreError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

/// Payment state of a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No completed checkout yet.
    #[default]
    Unpaid,
    /// Checkout completed and reconciled.
    Paid,
}

string_enum!(PaymentStatus, "payment status", {
    Unpaid => "unpaid",
    Paid => "paid",
});

// ── Rider ───────────────────────────────────────────────────────────────────

/// Approval status of a rider application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiderStatus {
    /// Submitted, awaiting an admin decision.
    #[default]
    Pending,
    /// Approved; the matching user is promoted to the rider role.
    Approved,
    /// Rejected by an admin.
    Rejected,
}

string_enum!(RiderStatus, "rider status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// Current availability of a rider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    /// Free to take an assignment.
    #[default]
    Available,
    /// Carrying a parcel.
    InDelivery,
}

string_enum!(WorkStatus, "work status", {
    Available => "available",
    InDelivery => "in_delivery",
});

// ── User ────────────────────────────────────────────────────────────────────

/// Role attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular sender.
    #[default]
    User,
    /// Platform administrator.
    Admin,
    /// Approved delivery rider.
    Rider,
}

string_enum!(Role, "role", {
    User => "user",
    Admin => "admin",
    Rider => "rider",
});
