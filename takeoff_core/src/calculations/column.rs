//! # Column Quantities
//!
//! Columns run from their placement level to an end level (explicit, or the
//! next level above). Height is therefore resolved before this calculator is
//! called.
//!
//! ## Formulas
//!
//! | Shape       | Cross-section      | Formwork             |
//! |-------------|--------------------|----------------------|
//! | Rectangular | `width × height`   | `2(width + height) × H` |
//! | Circular    | `π × (d / 2)²`     | `π × d × H`          |
//!
//! Concrete is `cross-section × H × (1 + waste)`. Main bars are `H + lap`;
//! ties are spaced along `H`.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::calculations::{column, CalcParams, ColumnShape};
//!
//! let shape = ColumnShape::Rectangular { width: 0.4, height: 0.4 };
//! let q = column::calculate(&shape, 3.0, None, &CalcParams::default()).unwrap();
//! assert_eq!(q.concrete.quantity, 0.504);
//! ```

use std::f64::consts::PI;

use crate::calculations::rebar::{bar_group, circular_tie_length, rectangular_tie_length, tie_group};
use crate::calculations::{CalcParams, ColumnShape, ElementQuantities, QuantityCalc, RebarRole, Reinforcement};
use crate::errors::{CalcError, CalcResult};
use crate::units::{round_to, Unit};

impl ColumnShape {
    /// Cross-sectional area (m²)
    pub fn area(&self) -> f64 {
        match *self {
            ColumnShape::Rectangular { width, height } => width * height,
            ColumnShape::Circular { diameter } => PI * (diameter / 2.0).powi(2),
        }
    }

    /// Outside perimeter (m)
    pub fn perimeter(&self) -> f64 {
        match *self {
            ColumnShape::Rectangular { width, height } => 2.0 * (width + height),
            ColumnShape::Circular { diameter } => PI * diameter,
        }
    }

    /// Perimeter of the bar cage inside cover (m)
    pub fn core_perimeter(&self, cover: f64) -> f64 {
        match *self {
            ColumnShape::Rectangular { width, height } => {
                2.0 * ((width - 2.0 * cover).max(0.0) + (height - 2.0 * cover).max(0.0))
            }
            ColumnShape::Circular { diameter } => PI * (diameter - 2.0 * cover).max(0.0),
        }
    }

    fn describe(&self) -> String {
        match *self {
            ColumnShape::Rectangular { width, height } => format!("{} × {}", width, height),
            ColumnShape::Circular { diameter } => format!("π × ({} / 2)²", diameter),
        }
    }
}

/// Column concrete volume (m³)
pub fn concrete_volume(shape: &ColumnShape, height: f64, waste: f64, decimals: u32) -> QuantityCalc {
    let section = shape.area();
    let raw = section * height * (1.0 + waste);
    QuantityCalc::new(
        round_to(raw, decimals),
        Unit::CubicMeter,
        format!("{} × {:.3} × (1 + {})", shape.describe(), height, waste),
        &[("section_area", section), ("column_height", height), ("waste", waste)],
    )
}

/// Column formwork (m²): four sides, or the cylindrical surface
pub fn formwork_area(shape: &ColumnShape, height: f64, decimals: u32) -> QuantityCalc {
    let perimeter = shape.perimeter();
    let formula = match *shape {
        ColumnShape::Rectangular { width, height: depth } => {
            format!("2 × ({} + {}) × {:.3}", width, depth, height)
        }
        ColumnShape::Circular { diameter } => format!("π × {} × {:.3}", diameter, height),
    };
    QuantityCalc::new(
        round_to(perimeter * height, decimals),
        Unit::SquareMeter,
        formula,
        &[("perimeter", perimeter), ("column_height", height)],
    )
}

/// Calculate all column quantities.
pub fn calculate(
    shape: &ColumnShape,
    height: f64,
    reinforcement: Option<&Reinforcement>,
    params: &CalcParams,
) -> CalcResult<ElementQuantities> {
    if !(height > 0.0) {
        return Err(CalcError::invalid_geometry(
            "column",
            format!("height {:.3} m must be positive", height),
        ));
    }

    let mut rebar = Vec::new();
    if let Some(config) = reinforcement {
        let item = config.pay_item.as_deref();
        let cage = shape.core_perimeter(params.cover_m);

        for (role, group) in [(RebarRole::Main, &config.main), (RebarRole::Secondary, &config.secondary)] {
            if let Some(group) = group {
                let size = group.validate(role.code())?;
                rebar.push(bar_group(
                    role,
                    group,
                    cage,
                    height + size.lap_length_m(),
                    params.rebar_waste,
                    params.rebar_decimals,
                    item,
                )?);
            }
        }

        if let Some(ties) = &config.ties {
            let size = ties.validate()?;
            let tie_length = match *shape {
                ColumnShape::Rectangular { width, height: depth } => {
                    rectangular_tie_length(width, depth, params.cover_m, size)
                }
                ColumnShape::Circular { diameter } => circular_tie_length(diameter, params.cover_m, size),
            };
            rebar.push(tie_group(
                RebarRole::Tie,
                ties,
                height,
                tie_length,
                params.rebar_waste,
                params.rebar_decimals,
                item,
            )?);
        }
    }

    Ok(ElementQuantities {
        concrete: concrete_volume(shape, height, params.concrete_waste, params.concrete_decimals),
        rebar,
        formwork: formwork_area(shape, height, params.formwork_decimals),
    })
}
