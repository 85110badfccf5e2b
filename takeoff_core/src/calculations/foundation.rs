//! # Foundation Quantities
//!
//! Two foundation forms:
//!
//! - **Mat**: a thick slab over a grid region. Concrete as a slab; formwork is
//!   the soffit plus perimeter edge forms (`perimeter × thickness`).
//! - **Footing**: an isolated pad with its own plan size. Concrete
//!   `length × width × depth × (1 + waste)`; formwork on four full-height sides.
//!   Bars run both ways inside cover.

use crate::calculations::rebar::bar_group;
use crate::calculations::slab::{self, require_plan};
use crate::calculations::{CalcParams, ElementQuantities, QuantityCalc, RebarRole, Reinforcement};
use crate::errors::{CalcError, CalcResult};
use crate::geometry::PlanRect;
use crate::units::{round_to, Unit};

/// Mat formwork (m²): soffit plus edge forms
pub fn mat_formwork(rect: &PlanRect, thickness: f64, decimals: u32) -> QuantityCalc {
    let soffit = rect.area();
    let perimeter = rect.perimeter();
    let edge = perimeter * thickness;
    QuantityCalc::new(
        round_to(soffit + edge, decimals),
        Unit::SquareMeter,
        format!(
            "({:.3} × {:.3}) + ({:.3} × {})",
            rect.length_x, rect.length_y, perimeter, thickness
        ),
        &[("plan_area", soffit), ("perimeter", perimeter), ("thickness", thickness)],
    )
}

/// Calculate mat foundation quantities.
pub fn calculate_mat(
    rect: &PlanRect,
    thickness: f64,
    reinforcement: Option<&Reinforcement>,
    params: &CalcParams,
) -> CalcResult<ElementQuantities> {
    require_plan(rect, "mat")?;
    let rebar = match reinforcement {
        Some(config) => slab::two_way_bars(rect, config, params)?,
        None => Vec::new(),
    };
    Ok(ElementQuantities {
        concrete: slab::concrete_volume(rect, thickness, params.concrete_waste, params.concrete_decimals),
        rebar,
        formwork: mat_formwork(rect, thickness, params.formwork_decimals),
    })
}

/// Footing concrete volume (m³)
pub fn footing_volume(length: f64, width: f64, depth: f64, waste: f64, decimals: u32) -> QuantityCalc {
    let raw = length * width * depth * (1.0 + waste);
    QuantityCalc::new(
        round_to(raw, decimals),
        Unit::CubicMeter,
        format!("{} × {} × {} × (1 + {})", length, width, depth, waste),
        &[("length", length), ("width", width), ("depth", depth), ("waste", waste)],
    )
}

/// Footing formwork (m²): four full-height sides
pub fn footing_formwork(length: f64, width: f64, depth: f64, decimals: u32) -> QuantityCalc {
    QuantityCalc::new(
        round_to(2.0 * (length + width) * depth, decimals),
        Unit::SquareMeter,
        format!("2 × ({} + {}) × {}", length, width, depth),
        &[("length", length), ("width", width), ("depth", depth)],
    )
}

/// Calculate isolated footing quantities.
///
/// Cover only constrains the bars; plain concrete footings of any plan size pass.
pub fn calculate_footing(
    length: f64,
    width: f64,
    depth: f64,
    reinforcement: Option<&Reinforcement>,
    params: &CalcParams,
) -> CalcResult<ElementQuantities> {
    let mut rebar = Vec::new();
    if let Some(config) = reinforcement {
        let cover = params.cover_m;
        let inner_length = length - 2.0 * cover;
        let inner_width = width - 2.0 * cover;
        if inner_length <= 0.0 || inner_width <= 0.0 {
            return Err(CalcError::invalid_input(
                "footing",
                format!("{} × {}", length, width),
                format!("plan size leaves no room inside {} m cover", cover),
            ));
        }

        let item = config.pay_item.as_deref();
        if let Some(main) = &config.main {
            rebar.push(bar_group(
                RebarRole::Main,
                main,
                inner_width,
                inner_length,
                params.rebar_waste,
                params.rebar_decimals,
                item,
            )?);
        }
        if let Some(secondary) = &config.secondary {
            rebar.push(bar_group(
                RebarRole::Secondary,
                secondary,
                inner_length,
                inner_width,
                params.rebar_waste,
                params.rebar_decimals,
                item,
            )?);
        }
    }

    Ok(ElementQuantities {
        concrete: footing_volume(length, width, depth, params.concrete_waste, params.concrete_decimals),
        rebar,
        formwork: footing_formwork(length, width, depth, params.formwork_decimals),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::BarGroup;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mat_edge_formwork() {
        let rect = PlanRect { length_x: 10.0, length_y: 8.0 };
        let q = calculate_mat(&rect, 0.5, None, &CalcParams::default()).unwrap();
        // 80 soffit + 36 × 0.5 edge
        assert_abs_diff_eq!(q.formwork.quantity, 98.0, epsilon = 1e-12);
        // 0.5 × 80 × 1.05
        assert_abs_diff_eq!(q.concrete.quantity, 42.0, epsilon = 1e-12);
    }

    #[test]
    fn test_footing() {
        let config = Reinforcement {
            main: Some(BarGroup::spacing(16, 0.15)),
            secondary: Some(BarGroup::spacing(16, 0.15)),
            ..Default::default()
        };
        let q = calculate_footing(1.5, 1.5, 0.4, Some(&config), &CalcParams::default()).unwrap();
        // 1.5 × 1.5 × 0.4 × 1.05 = 0.945
        assert_eq!(q.concrete.quantity, 0.945);
        assert_abs_diff_eq!(q.formwork.quantity, 2.4, epsilon = 1e-12);
        // inner 1.42 m: floor(1.42 / 0.15) + 1 = 10
        assert_eq!(q.rebar[0].bar_count, 10);
        assert_abs_diff_eq!(q.rebar[0].bar_length_m, 1.42, epsilon = 1e-12);
    }

    #[test]
    fn test_footing_smaller_than_cover() {
        let bars = Reinforcement {
            main: Some(BarGroup::spacing(12, 0.15)),
            ..Default::default()
        };
        let err = calculate_footing(0.05, 1.0, 0.3, Some(&bars), &CalcParams::default()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_plain_footing_ignores_cover() {
        let q = calculate_footing(0.05, 1.0, 0.3, None, &CalcParams::default()).unwrap();
        assert!(q.rebar.is_empty());
        // 2 × 1.05 × 0.3
        assert_abs_diff_eq!(q.formwork.quantity, 0.63, epsilon = 1e-12);
    }
}
