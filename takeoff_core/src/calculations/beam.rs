//! # Beam Quantities
//!
//! Quantities for a rectangular beam spanning between two grid lines.
//!
//! ## Formulas
//!
//! - Concrete: `width × height × length × (1 + waste)`
//! - Formwork: `(width + 2 × height) × length` (bottom plus two sides)
//! - Main / secondary bars: `length + lap` each, spread across `width - 2 × cover`
//! - Stirrups: `floor(length / spacing) + 1`, each the tie perimeter plus hooks
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::calculations::{beam, CalcParams};
//!
//! let q = beam::calculate(4.0, 0.30, 0.50, None, &CalcParams::default()).unwrap();
//! assert_eq!(q.concrete.quantity, 0.63);
//! assert_eq!(q.formwork.quantity, 5.2);
//! ```

use crate::calculations::rebar::{bar_group, rectangular_tie_length, tie_group};
use crate::calculations::{CalcParams, ElementQuantities, QuantityCalc, RebarRole, Reinforcement};
use crate::errors::{CalcError, CalcResult};
use crate::units::{round_to, Unit};

/// Beam concrete volume (m³)
pub fn concrete_volume(length: f64, width: f64, height: f64, waste: f64, decimals: u32) -> QuantityCalc {
    let raw = width * height * length * (1.0 + waste);
    QuantityCalc::new(
        round_to(raw, decimals),
        Unit::CubicMeter,
        format!("{} × {} × {:.3} × (1 + {})", width, height, length, waste),
        &[("width", width), ("height", height), ("length", length), ("waste", waste)],
    )
}

/// Beam formwork contact area (m²): bottom plus two sides
pub fn formwork_area(length: f64, width: f64, height: f64, decimals: u32) -> QuantityCalc {
    let raw = (width + 2.0 * height) * length;
    QuantityCalc::new(
        round_to(raw, decimals),
        Unit::SquareMeter,
        format!("({} + 2 × {}) × {:.3}", width, height, length),
        &[("width", width), ("height", height), ("length", length)],
    )
}

/// Calculate all beam quantities.
pub fn calculate(
    length: f64,
    width: f64,
    height: f64,
    reinforcement: Option<&Reinforcement>,
    params: &CalcParams,
) -> CalcResult<ElementQuantities> {
    if !(length > 0.0) {
        return Err(CalcError::invalid_geometry(
            "beam",
            format!("span length {:.3} m must be positive", length),
        ));
    }

    let mut rebar = Vec::new();
    if let Some(config) = reinforcement {
        let item = config.pay_item.as_deref();
        let run = (width - 2.0 * params.cover_m).max(0.0);

        for (role, group) in [(RebarRole::Main, &config.main), (RebarRole::Secondary, &config.secondary)] {
            if let Some(group) = group {
                let size = group.validate(role.code())?;
                rebar.push(bar_group(
                    role,
                    group,
                    run,
                    length + size.lap_length_m(),
                    params.rebar_waste,
                    params.rebar_decimals,
                    item,
                )?);
            }
        }

        if let Some(ties) = &config.ties {
            let size = ties.validate()?;
            let tie_length = rectangular_tie_length(width, height, params.cover_m, size);
            rebar.push(tie_group(
                RebarRole::Stirrup,
                ties,
                length,
                tie_length,
                params.rebar_waste,
                params.rebar_decimals,
                item,
            )?);
        }
    }

    Ok(ElementQuantities {
        concrete: concrete_volume(length, width, height, params.concrete_waste, params.concrete_decimals),
        rebar,
        formwork: formwork_area(length, width, height, params.formwork_decimals),
    })
}
