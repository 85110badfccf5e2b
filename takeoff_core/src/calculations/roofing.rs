//! # Roof Coverings
//!
//! Slope-adjusted roof area over a grid region.
//!
//! ```text
//! plan   = (length_x + 2 × overhang) × (length_y + 2 × overhang)
//! sloped = plan / cos(θ)
//! ```
//!
//! The slope is given either as rise over run or directly in degrees.

use serde::{Deserialize, Serialize};

use crate::calculations::QuantityCalc;
use crate::errors::{CalcError, CalcResult};
use crate::geometry::{GridArea, GridSystem};
use crate::units::{round_to, Unit};

/// Roof pitch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoofSlope {
    Ratio { rise: f64, run: f64 },
    Degrees(f64),
}

impl RoofSlope {
    /// Slope angle in radians, in `[0, π/2)`
    pub fn angle_rad(&self) -> CalcResult<f64> {
        match *self {
            RoofSlope::Ratio { rise, run } => {
                if !(run > 0.0) || !(rise >= 0.0) {
                    return Err(CalcError::invalid_input(
                        "slope",
                        format!("{}:{}", rise, run),
                        "rise must be non-negative and run positive",
                    ));
                }
                Ok((rise / run).atan())
            }
            RoofSlope::Degrees(deg) => {
                if !(0.0..90.0).contains(&deg) {
                    return Err(CalcError::invalid_input(
                        "slope",
                        deg.to_string(),
                        "degrees must be in [0, 90)",
                    ));
                }
                Ok(deg.to_radians())
            }
        }
    }
}

/// Roof covering material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub pay_item: Option<String>,
    #[serde(default)]
    pub waste: f64,
}

/// A roof plane covering a grid region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofPlane {
    pub id: String,
    pub name: String,
    pub level: String,
    pub area: GridArea,
    #[serde(default)]
    pub eave_overhang_m: f64,
    pub slope: RoofSlope,
    pub roof_type_id: String,
    /// Filled in by `annotate_roof_planes`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed: Option<RoofPlaneGeometry>,
}

/// Derived roof plane geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoofPlaneGeometry {
    pub plan_length_x_m: f64,
    pub plan_length_y_m: f64,
    pub plan_area_m2: f64,
    pub slope_angle_deg: f64,
    /// `1 / cos(θ)`
    pub slope_factor: f64,
    pub sloped_area_m2: f64,
}

/// Resolve the plan and sloped area of a roof plane.
pub fn roof_plane_geometry(plane: &RoofPlane, grid: &GridSystem) -> CalcResult<RoofPlaneGeometry> {
    if !(plane.eave_overhang_m >= 0.0) {
        return Err(CalcError::invalid_input(
            format!("roof plane {} eave_overhang_m", plane.id),
            plane.eave_overhang_m.to_string(),
            "Cannot be negative",
        ));
    }
    let rect = grid.plan_rect(&plane.area)?;
    let length_x = rect.length_x + 2.0 * plane.eave_overhang_m;
    let length_y = rect.length_y + 2.0 * plane.eave_overhang_m;
    let plan_area = length_x * length_y;
    if !(plan_area > 0.0) {
        return Err(CalcError::invalid_geometry(
            format!("roof plane {}", plane.id),
            "plan region has no area",
        ));
    }

    let angle = plane.slope.angle_rad()?;
    let slope_factor = 1.0 / angle.cos();
    Ok(RoofPlaneGeometry {
        plan_length_x_m: length_x,
        plan_length_y_m: length_y,
        plan_area_m2: plan_area,
        slope_angle_deg: angle.to_degrees(),
        slope_factor,
        sloped_area_m2: plan_area * slope_factor,
    })
}

/// Roof covering area with waste applied.
pub fn covering_area(
    plane: &RoofPlane,
    geometry: &RoofPlaneGeometry,
    roof_type: &RoofType,
    decimals: u32,
) -> CalcResult<QuantityCalc> {
    if !(roof_type.waste >= 0.0) {
        return Err(CalcError::invalid_input(
            format!("roof type {} waste", roof_type.id),
            roof_type.waste.to_string(),
            "Cannot be negative",
        ));
    }
    let waste = roof_type.waste;
    Ok(QuantityCalc::new(
        round_to(geometry.sloped_area_m2 * (1.0 + waste), decimals),
        Unit::SquareMeter,
        format!(
            "({:.3} × {:.3}) / cos({:.2}°) × (1 + {})",
            geometry.plan_length_x_m, geometry.plan_length_y_m, geometry.slope_angle_deg, waste
        ),
        &[
            ("plan_length_x", geometry.plan_length_x_m),
            ("plan_length_y", geometry.plan_length_y_m),
            ("eave_overhang", plane.eave_overhang_m),
            ("slope_angle_deg", geometry.slope_angle_deg),
            ("waste", waste),
        ],
    ))
}

/// Store computed geometry on each plane that resolves.
///
/// Returns one message per plane that could not be resolved; those planes keep
/// whatever `computed` value they had.
pub fn annotate_roof_planes(planes: &mut [RoofPlane], grid: &GridSystem) -> Vec<String> {
    let mut errors = Vec::new();
    for plane in planes.iter_mut() {
        match roof_plane_geometry(plane, grid) {
            Ok(geometry) => plane.computed = Some(geometry),
            Err(e) => {
                tracing::warn!("roof plane {}: {}", plane.id, e);
                errors.push(format!("Roof plane {}: {}", plane.id, e));
            }
        }
    }
    errors
}
