//! # Materials
//!
//! Material constants and lookup tables used by the quantity calculators.
//!
//! - [`rebar`] - Standard deformed bar sizes (weight, lap, grade, pay item)

pub mod rebar;

pub use rebar::{BarSize, RebarGrade};

/// Density of structural steel (kg/m³)
pub const STEEL_DENSITY_KG_M3: f64 = 7850.0;
