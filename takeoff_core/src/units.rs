//! # Unit Types
//!
//! Type-safe wrappers for the metric units used in quantity takeoff, plus the
//! unit-of-measure tag carried by every takeoff line and the rounding rule
//! applied to reported quantities.
//!
//! ## Conventions
//!
//! - Geometry (grids, levels, template dimensions): metres
//! - Truss parameters: millimetres (converted to metres on entry)
//! - Reinforcing bar diameters: millimetres
//! - Quantities: m³ (concrete), kg (steel), m² (formwork, finishes, roofing)
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::units::{round_to, Meters, Millimeters};
//!
//! let span = Millimeters(8000.0);
//! let span_m: Meters = span.into();
//! assert_eq!(span_m.0, 8.0);
//!
//! assert_eq!(round_to(0.62999, 3), 0.63);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

// ============================================================================
// Length Units
// ============================================================================

/// Length in metres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meters(pub f64);

/// Length in millimetres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millimeters(pub f64);

impl From<Millimeters> for Meters {
    fn from(mm: Millimeters) -> Self {
        Meters(mm.0 / 1000.0)
    }
}

impl From<Meters> for Millimeters {
    fn from(m: Meters) -> Self {
        Millimeters(m.0 * 1000.0)
    }
}

// ============================================================================
// Area / Volume / Mass
// ============================================================================

/// Area in square metres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SquareMeters(pub f64);

/// Volume in cubic metres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CubicMeters(pub f64);

/// Mass in kilograms
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kilograms(pub f64);

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }

            /// Create from raw f64 value
            pub fn new(value: f64) -> Self {
                Self(value)
            }
        }
    };
}

impl_arithmetic!(Meters);
impl_arithmetic!(Millimeters);
impl_arithmetic!(SquareMeters);
impl_arithmetic!(CubicMeters);
impl_arithmetic!(Kilograms);

impl Mul<Meters> for Meters {
    type Output = SquareMeters;
    fn mul(self, rhs: Meters) -> SquareMeters {
        SquareMeters(self.0 * rhs.0)
    }
}

impl Mul<Meters> for SquareMeters {
    type Output = CubicMeters;
    fn mul(self, rhs: Meters) -> CubicMeters {
        CubicMeters(self.0 * rhs.0)
    }
}

// ============================================================================
// Unit of measure
// ============================================================================

/// Unit of measure attached to a takeoff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "cu.m")]
    CubicMeter,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "sq.m")]
    SquareMeter,
    #[serde(rename = "pcs")]
    Piece,
    #[serde(rename = "l.m")]
    LinearMeter,
    #[serde(rename = "set")]
    Set,
    #[serde(rename = "lot")]
    Lot,
}

impl Unit {
    /// Display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::CubicMeter => "cu.m",
            Unit::Kilogram => "kg",
            Unit::SquareMeter => "sq.m",
            Unit::Piece => "pcs",
            Unit::LinearMeter => "l.m",
            Unit::Set => "set",
            Unit::Lot => "lot",
        }
    }

    /// Decimal places used when a BOQ line total is rounded.
    ///
    /// Volumes keep three decimals; everything else keeps two.
    pub fn boq_decimals(&self) -> u32 {
        match self {
            Unit::CubicMeter => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ============================================================================
// Rounding
// ============================================================================

/// Nudge applied before rounding so that values such as `1.005` (stored as
/// `1.00499999...`) still round half away from zero at the decimal boundary.
const TIE_EPSILON: f64 = 1e-9;

/// Round `value` to `decimals` places, half away from zero.
///
/// Rounding an already-rounded value returns it unchanged. Non-finite inputs
/// and scales that overflow are returned as-is.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals.min(i32::MAX as u32) as i32);
    let scaled = value * factor;
    if !scaled.is_finite() || !factor.is_finite() {
        return value;
    }
    let rounded = (scaled + scaled.signum() * TIE_EPSILON).round() / factor;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mm_to_m() {
        let mm = Millimeters(1600.0);
        let m: Meters = mm.into();
        assert_eq!(m.0, 1.6);
    }

    #[test]
    fn test_arithmetic() {
        let a = Meters(4.0);
        let b = Meters(0.5);
        assert_eq!((a + b).0, 4.5);
        assert_eq!((a - b).0, 3.5);
        assert_eq!((a * 2.0).0, 8.0);
        assert_eq!((a / 2.0).0, 2.0);
        let area = a * b;
        assert_eq!(area, SquareMeters(2.0));
        assert_eq!(area * Meters(0.5), CubicMeters(1.0));
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(1.005, 2), 1.01);
        assert_eq!(round_to(0.6300000000000001, 3), 0.63);
        assert_eq!(round_to(-0.125, 2), -0.13);
    }

    #[test]
    fn test_round_is_idempotent() {
        let samples = [0.0, 0.63, 1.005, -7.777_777, 123_456.789_123, 1e-7, 2.675];
        for &x in &samples {
            for d in 0..=6 {
                let once = round_to(x, d);
                assert_eq!(round_to(once, d), once, "x={x}, d={d}");
            }
        }
    }

    #[test]
    fn test_round_non_finite_passthrough() {
        assert!(round_to(f64::NAN, 2).is_nan());
        assert_eq!(round_to(f64::INFINITY, 2), f64::INFINITY);
        assert_eq!(round_to(1e300, 20), 1e300);
    }

    #[test]
    fn test_unit_serialization() {
        let json = serde_json::to_string(&Unit::CubicMeter).unwrap();
        assert_eq!(json, "\"cu.m\"");
        let roundtrip: Unit = serde_json::from_str("\"kg\"").unwrap();
        assert_eq!(roundtrip, Unit::Kilogram);
        assert_eq!(Unit::CubicMeter.boq_decimals(), 3);
        assert_eq!(Unit::SquareMeter.boq_decimals(), 2);
    }
}
