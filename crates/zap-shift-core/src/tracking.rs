//! # Tracking Identifiers
//!
//! A tracking identifier names a parcel's lifecycle event stream:
//!
//! ```text
//! PRCL-<YYYYMMDD>-<6 uppercase hex chars>
//! ```
//!
//! The date is the UTC generation date; the suffix is three bytes from the
//! operating system CSPRNG. No uniqueness check is made against existing
//! identifiers (16.7M combinations per day).

use std::fmt;

use chrono::{NaiveDate, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const PREFIX: &str = "PRCL";

/// A parcel tracking identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
    /// Generate a new identifier stamped with today's UTC date.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now().date_naive())
    }

    /// Generate an identifier for the given date.
    pub fn generate_at(date: NaiveDate) -> Self {
        let mut suffix = [0u8; 3];
        OsRng.fill_bytes(&mut suffix);
        let hex: String = suffix.iter().map(|b| format!("{b:02X}")).collect();
        Self(format!("{PREFIX}-{}-{hex}", date.format("%Y%m%d")))
    }

    /// Wrap an existing identifier (e.g. from a path parameter). No
    /// format validation: ledger lookups by unknown ids are simply empty.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Whether the identifier has the generated shape.
    pub fn is_well_formed(&self) -> bool {
        let mut parts = self.0.split('-');
        let (Some(prefix), Some(date), Some(hex), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        prefix == PREFIX
            && date.len() == 8
            && date.bytes().all(|b| b.is_ascii_digit())
            && hex.len() == 6
            && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F'))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TrackingId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn generated_id_is_well_formed() {
        let id = TrackingId::generate();
        assert!(id.is_well_formed(), "{id}");
        assert_eq!(id.as_str().len(), "PRCL-20260101-ABCDEF".len());
    }

    #[test]
    fn generated_id_carries_the_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let id = TrackingId::generate_at(date);
        assert!(id.as_str().starts_with("PRCL-20260307-"), "{id}");
    }

    #[test]
    fn suffix_is_uppercase_hex() {
        let id = TrackingId::generate();
        let suffix = id.as_str().rsplit('-').next().unwrap();
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn malformed_ids_detected() {
        for raw in [
            "",
            "PRCL-2026010-ABCDEF",
            "PRCL-20260101-abcdef",
            "PRCL-20260101-ABCDEG",
            "PKG-20260101-ABCDEF",
            "PRCL-20260101-ABCDEF-1",
        ] {
            assert!(!TrackingId::from_raw(raw).is_well_formed(), "{raw}");
        }
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = TrackingId::from_raw("PRCL-20260101-0A1B2C");
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"PRCL-20260101-0A1B2C\""
        );
    }

    proptest! {
        #[test]
        fn any_date_yields_well_formed_id(days in 0i64..40_000) {
            let date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
                + chrono::Duration::days(days);
            prop_assert!(TrackingId::generate_at(date).is_well_formed());
        }
    }
}
