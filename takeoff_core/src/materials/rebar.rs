//! Deformed Reinforcing Bars
//!
//! Standard metric bar sizes with the per-diameter values a takeoff needs:
//! unit weight, lap splice length, steel grade, and the governing DPWH pay item.
//!
//! - Unit weight: `d² / 162` kg/m (steel at 7850 kg/m³)
//! - Lap length: 40 bar diameters
//! - Grade 40 up to 12 mm, Grade 60 above

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Lap splice length in bar diameters
pub const LAP_DIAMETERS: f64 = 40.0;

/// Hook extension in bar diameters (ties and stirrups)
pub const HOOK_DIAMETERS: f64 = 12.0;

/// Minimum hook extension (m)
pub const MIN_HOOK_M: f64 = 0.075;

/// Standard bar sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BarSize {
    D10,
    D12,
    D16,
    D20,
    D25,
    D28,
    D32,
    D36,
}

/// Reinforcing steel grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RebarGrade {
    #[serde(rename = "Grade 40")]
    Grade40,
    #[serde(rename = "Grade 60")]
    Grade60,
}

impl RebarGrade {
    pub fn display_name(&self) -> &'static str {
        match self {
            RebarGrade::Grade40 => "Grade 40",
            RebarGrade::Grade60 => "Grade 60",
        }
    }

    /// DPWH item for deformed bars of this grade
    pub fn pay_item(&self) -> &'static str {
        match self {
            RebarGrade::Grade40 => "902 (1) a1",
            RebarGrade::Grade60 => "902 (1) a2",
        }
    }
}

impl fmt::Display for RebarGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl BarSize {
    pub const ALL: [BarSize; 8] = [
        BarSize::D10,
        BarSize::D12,
        BarSize::D16,
        BarSize::D20,
        BarSize::D25,
        BarSize::D28,
        BarSize::D32,
        BarSize::D36,
    ];

    pub fn diameter_mm(&self) -> u32 {
        match self {
            BarSize::D10 => 10,
            BarSize::D12 => 12,
            BarSize::D16 => 16,
            BarSize::D20 => 20,
            BarSize::D25 => 25,
            BarSize::D28 => 28,
            BarSize::D32 => 32,
            BarSize::D36 => 36,
        }
    }

    /// Look up a bar size by nominal diameter
    pub fn from_diameter(diameter_mm: u32) -> CalcResult<Self> {
        BarSize::ALL
            .iter()
            .copied()
            .find(|size| size.diameter_mm() == diameter_mm)
            .ok_or_else(|| {
                CalcError::invalid_input(
                    "diameter_mm",
                    diameter_mm.to_string(),
                    "Not a standard bar size (10, 12, 16, 20, 25, 28, 32, 36)",
                )
            })
    }

    pub fn diameter_m(&self) -> f64 {
        self.diameter_mm() as f64 / 1000.0
    }

    /// Mass per metre of bar (kg/m)
    pub fn unit_weight_kg_per_m(&self) -> f64 {
        let d = self.diameter_mm() as f64;
        d * d / 162.0
    }

    /// Lap splice length (m)
    pub fn lap_length_m(&self) -> f64 {
        LAP_DIAMETERS * self.diameter_m()
    }

    /// One hook extension for a tie or stirrup (m)
    pub fn hook_length_m(&self) -> f64 {
        (HOOK_DIAMETERS * self.diameter_m()).max(MIN_HOOK_M)
    }

    pub fn grade(&self) -> RebarGrade {
        if self.diameter_mm() <= 12 {
            RebarGrade::Grade40
        } else {
            RebarGrade::Grade60
        }
    }

    /// Governing DPWH item inferred from diameter
    pub fn pay_item(&self) -> &'static str {
        self.grade().pay_item()
    }
}

impl fmt::Display for BarSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}mm", self.diameter_mm())
    }
}
