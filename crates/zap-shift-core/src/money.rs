//! # Checkout Amounts
//!
//! Parcel costs arrive from the sender dashboard either as JSON numbers or as
//! numeric strings (`"12.50"`). The hosted checkout wants an integer amount in
//! minor currency units.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::CoreError;

/// A parcel cost as submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Cost {
    /// `"cost": 12.5`
    Number(f64),
    /// `"cost": "12.50"`
    Text(String),
}

impl Cost {
    /// The cost in major units.
    pub fn value(&self) -> Result<f64, CoreError> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| CoreError::InvalidAmount(format!("not a number: {s:?}")))?,
        };
        if !value.is_finite() {
            return Err(CoreError::InvalidAmount(format!("not finite: {value}")));
        }
        if value < 0.0 {
            return Err(CoreError::InvalidAmount(format!("negative: {value}")));
        }
        Ok(value)
    }
}

impl From<f64> for Cost {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Convert a cost to minor units: `cost × 100`, truncated toward zero.
///
/// Fractional cents are dropped, not rounded, so `19.99` becomes `1998`
/// because of binary floating-point representation.
pub fn minor_units(cost: &Cost) -> Result<i64, CoreError> {
    let cents = (cost.value()? * 100.0).trunc();
    if cents > i64::MAX as f64 {
        return Err(CoreError::InvalidAmount(format!("too large: {cents}")));
    }
    Ok(cents as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn string_cost_converted() {
        assert_eq!(minor_units(&Cost::Text("12.50".into())).unwrap(), 1250);
    }

    #[test]
    fn numeric_cost_converted() {
        assert_eq!(minor_units(&Cost::Number(10.0)).unwrap(), 1000);
    }

    #[test]
    fn fractional_cents_truncated() {
        assert_eq!(minor_units(&Cost::Text("12.345".into())).unwrap(), 1234);
        assert_eq!(minor_units(&Cost::Number(19.99)).unwrap(), 1998);
    }

    #[test]
    fn garbage_rejected() {
        assert!(minor_units(&Cost::Text("ten dollars".into())).is_err());
        assert!(minor_units(&Cost::Number(-1.0)).is_err());
        assert!(minor_units(&Cost::Number(f64::NAN)).is_err());
    }

    #[test]
    fn cost_deserializes_from_number_or_string() {
        let n: Cost = serde_json::from_str("12.5").unwrap();
        let s: Cost = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(n.value().unwrap(), s.value().unwrap());
    }

    proptest! {
        #[test]
        fn whole_amounts_are_exact(units in 0u32..1_000_000) {
            prop_assert_eq!(minor_units(&Cost::Number(units as f64)).unwrap(), units as i64 * 100);
        }
    }
}
