//! # Slab Quantities
//!
//! Suspended slab over a rectangular grid region.
//!
//! - Concrete: `thickness × plan_area × (1 + waste)`
//! - Formwork: soffit, the full plan area
//! - Main bars run along x and are spread across y; secondary bars the other way.
//!   Each bar is the span it runs along plus one lap.

use crate::calculations::rebar::bar_group;
use crate::calculations::{CalcParams, ElementQuantities, QuantityCalc, RebarCalc, RebarRole, Reinforcement};
use crate::errors::{CalcError, CalcResult};
use crate::geometry::PlanRect;
use crate::units::{round_to, Unit};

/// Plan-slab concrete volume (m³), shared with mat foundations
pub fn concrete_volume(rect: &PlanRect, thickness: f64, waste: f64, decimals: u32) -> QuantityCalc {
    let area = rect.area();
    let raw = thickness * area * (1.0 + waste);
    QuantityCalc::new(
        round_to(raw, decimals),
        Unit::CubicMeter,
        format!("{} × ({:.3} × {:.3}) × (1 + {})", thickness, rect.length_x, rect.length_y, waste),
        &[
            ("thickness", thickness),
            ("length_x", rect.length_x),
            ("length_y", rect.length_y),
            ("plan_area", area),
            ("waste", waste),
        ],
    )
}

/// Soffit formwork (m²)
pub fn soffit_formwork(rect: &PlanRect, decimals: u32) -> QuantityCalc {
    QuantityCalc::new(
        round_to(rect.area(), decimals),
        Unit::SquareMeter,
        format!("{:.3} × {:.3}", rect.length_x, rect.length_y),
        &[("length_x", rect.length_x), ("length_y", rect.length_y)],
    )
}

/// Two-way mesh over a plan region.
pub fn two_way_bars(
    rect: &PlanRect,
    config: &Reinforcement,
    params: &CalcParams,
) -> CalcResult<Vec<RebarCalc>> {
    let item = config.pay_item.as_deref();
    let mut bars = Vec::new();
    if let Some(main) = &config.main {
        let size = main.validate("main")?;
        bars.push(bar_group(
            RebarRole::Main,
            main,
            rect.length_y,
            rect.length_x + size.lap_length_m(),
            params.rebar_waste,
            params.rebar_decimals,
            item,
        )?);
    }
    if let Some(secondary) = &config.secondary {
        let size = secondary.validate("secondary")?;
        bars.push(bar_group(
            RebarRole::Secondary,
            secondary,
            rect.length_x,
            rect.length_y + size.lap_length_m(),
            params.rebar_waste,
            params.rebar_decimals,
            item,
        )?);
    }
    Ok(bars)
}

pub(crate) fn require_plan(rect: &PlanRect, subject: &str) -> CalcResult<()> {
    if !(rect.area() > 0.0) {
        return Err(CalcError::invalid_geometry(
            subject,
            format!("plan region {:.3} × {:.3} m has no area", rect.length_x, rect.length_y),
        ));
    }
    Ok(())
}

/// Calculate all slab quantities.
pub fn calculate(
    rect: &PlanRect,
    thickness: f64,
    reinforcement: Option<&Reinforcement>,
    params: &CalcParams,
) -> CalcResult<ElementQuantities> {
    require_plan(rect, "slab")?;
    let rebar = match reinforcement {
        Some(config) => two_way_bars(rect, config, params)?,
        None => Vec::new(),
    };
    Ok(ElementQuantities {
        concrete: concrete_volume(rect, thickness, params.concrete_waste, params.concrete_decimals),
        rebar,
        formwork: soffit_formwork(rect, params.formwork_decimals),
    })
}
