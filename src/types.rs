//! Common constants, axis identifiers and scalar validation.
//!
//! Everything in here is shared by the geometry, optimizer and packaging
//! modules so the numeric conventions stay in one place.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Thickness of the comb material in millimetres.
///
/// Every slot is cut this wide, so the usable span between two engaged
/// notches is their distance minus one thickness.
pub const THICKNESS: f64 = 3.0;

/// Global numerical tolerance for band and slack comparisons.
pub const EPSILON_GENERAL: f64 = 1e-9;

/// One of the two perpendicular directions of a lattice.
///
/// `Axis1` runs along the item width, `Axis2` along the item depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Axis1,
    Axis2,
}

impl Axis {
    /// Both axes in the order the optimizer assigns them.
    pub const ALL: [Axis; 2] = [Axis::Axis1, Axis::Axis2];
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Axis1 => write!(f, "axis1"),
            Axis::Axis2 => write!(f, "axis2"),
        }
    }
}

/// Compares two values and treats them as equal within `eps`.
#[inline]
pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

/// Orders two values, treating differences up to `eps` as equal.
#[inline]
pub fn compare_with_epsilon(a: f64, b: f64, eps: f64) -> Ordering {
    if approx_eq(a, b, eps) {
        Ordering::Equal
    } else if a < b {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Validation functions shared by the model types.
pub mod validation {
    /// Validates a strictly positive, finite scalar.
    ///
    /// # Returns
    /// `Ok(())` for valid values, otherwise error text
    pub fn validate_positive(value: f64, name: &str) -> Result<(), String> {
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        if value <= 0.0 {
            return Err(format!("{} must be positive, got: {}", name, value));
        }
        Ok(())
    }

    /// Validates a finite scalar that may be zero (prices, gaps, margins).
    pub fn validate_non_negative(value: f64, name: &str) -> Result<(), String> {
        if !value.is_finite() {
            return Err(format!("{} must be finite, got: {}", name, value));
        }
        if value < 0.0 {
            return Err(format!("{} must not be negative, got: {}", name, value));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_display_matches_serde_name() {
        for axis in Axis::ALL {
            let json = serde_json::to_string(&axis).unwrap();
            assert_eq!(json, format!("\"{}\"", axis));
        }
    }

    #[test]
    fn test_axis_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Axis::Axis1).unwrap(), "\"axis1\"");
        let parsed: Axis = serde_json::from_str("\"axis2\"").unwrap();
        assert_eq!(parsed, Axis::Axis2);
    }

    #[test]
    fn test_validation_positive() {
        assert!(validation::validate_positive(10.0, "Width").is_ok());
        assert!(validation::validate_positive(0.0, "Width").is_err());
        assert!(validation::validate_positive(-1.0, "Width").is_err());
        assert!(validation::validate_positive(f64::NAN, "Width").is_err());
        assert!(validation::validate_positive(f64::INFINITY, "Width").is_err());
    }

    #[test]
    fn test_validation_non_negative() {
        assert!(validation::validate_non_negative(0.0, "Price").is_ok());
        assert!(validation::validate_non_negative(2.5, "Price").is_ok());
        assert!(validation::validate_non_negative(-0.1, "Price").is_err());
        assert!(validation::validate_non_negative(f64::NAN, "Price").is_err());
    }

    #[test]
    fn test_approx_eq() {
        assert!(approx_eq(1.0, 1.0 + 1e-12, EPSILON_GENERAL));
        assert!(!approx_eq(1.0, 1.1, EPSILON_GENERAL));
    }

    #[test]
    fn test_compare_with_epsilon() {
        assert_eq!(compare_with_epsilon(1.0, 1.0 + 1e-12, 1e-9), Ordering::Equal);
        assert_eq!(compare_with_epsilon(1.0, 2.0, 1e-9), Ordering::Less);
        assert_eq!(compare_with_epsilon(2.0, 1.0, 1e-9), Ordering::Greater);
    }
}
