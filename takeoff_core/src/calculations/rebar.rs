//! # Reinforcement Weights
//!
//! Shared rules for turning a bar group into a weight:
//!
//! ```text
//! weight = bar_count × bar_length × unit_weight(d) × (1 + waste)
//! ```
//!
//! Distributed bars given by spacing get `floor(run / spacing) + 1` bars.
//! The governing DPWH item is the template's explicit item when present,
//! otherwise the item for the bar's grade.

use crate::calculations::template::{BarGroup, BarLayout, TieSpec};
use crate::calculations::{QuantityCalc, RebarCalc, RebarRole};
use crate::errors::{CalcError, CalcResult};
use crate::materials::BarSize;
use crate::units::{round_to, Unit};

/// Guards `floor` against runs like `3.0 / 0.1 = 29.999999999999996`
const COUNT_EPSILON: f64 = 1e-9;

/// Number of bars laid across `run_m`.
pub fn distributed_count(run_m: f64, layout: &BarLayout) -> CalcResult<u32> {
    match *layout {
        BarLayout::Count(count) => Ok(count),
        BarLayout::Spacing(spacing) => {
            if !(spacing > 0.0) {
                return Err(CalcError::invalid_input(
                    "spacing_m",
                    spacing.to_string(),
                    "Spacing must be positive",
                ));
            }
            if run_m < 0.0 {
                return Err(CalcError::invalid_input(
                    "run",
                    run_m.to_string(),
                    "Run length cannot be negative",
                ));
            }
            Ok((run_m / spacing + COUNT_EPSILON).floor() as u32 + 1)
        }
    }
}

/// Perimeter of a rectangular tie inside cover plus two hooks
pub fn rectangular_tie_length(width: f64, height: f64, cover: f64, size: BarSize) -> f64 {
    let inner = 2.0 * ((width - 2.0 * cover).max(0.0) + (height - 2.0 * cover).max(0.0));
    inner + 2.0 * size.hook_length_m()
}

/// Circumference of a circular tie inside cover plus two hooks
pub fn circular_tie_length(diameter: f64, cover: f64, size: BarSize) -> f64 {
    std::f64::consts::PI * (diameter - 2.0 * cover).max(0.0) + 2.0 * size.hook_length_m()
}

fn resolve_item(size: BarSize, explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .unwrap_or_else(|| size.pay_item().to_string())
}

fn weight_calc(
    role: RebarRole,
    size: BarSize,
    count: u32,
    bar_length_m: f64,
    waste: f64,
    decimals: u32,
    explicit_item: Option<&str>,
) -> RebarCalc {
    let unit_weight = size.unit_weight_kg_per_m();
    let raw = count as f64 * bar_length_m * unit_weight * (1.0 + waste);
    let weight = QuantityCalc::new(
        round_to(raw, decimals),
        Unit::Kilogram,
        format!(
            "{} × {:.3} m × {:.3} kg/m × (1 + {})",
            count, bar_length_m, unit_weight, waste
        ),
        &[
            ("bar_count", count as f64),
            ("bar_length_m", bar_length_m),
            ("diameter_mm", size.diameter_mm() as f64),
            ("unit_weight_kg_per_m", unit_weight),
            ("waste", waste),
        ],
    );
    let pay_item = resolve_item(size, explicit_item);
    let assumptions = vec![
        format!("Bar {} {} ({})", size, role, size.grade()),
        format!("Lap length {:.3} m (40d)", size.lap_length_m()),
        format!("DPWH Item: {}", pay_item),
    ];
    RebarCalc {
        role,
        bar_size: size,
        bar_count: count,
        bar_length_m,
        weight,
        pay_item,
        assumptions,
    }
}

/// Longitudinal bar group: `run_m` is the width the bars are spread across,
/// `bar_length_m` the length of each bar.
pub fn bar_group(
    role: RebarRole,
    group: &BarGroup,
    run_m: f64,
    bar_length_m: f64,
    waste: f64,
    decimals: u32,
    explicit_item: Option<&str>,
) -> CalcResult<RebarCalc> {
    let size = group.validate(role.code())?;
    let count = distributed_count(run_m, &group.layout)?;
    Ok(weight_calc(role, size, count, bar_length_m, waste, decimals, explicit_item))
}

/// Ties or stirrups spaced along `member_length_m`, each `tie_length_m` long.
pub fn tie_group(
    role: RebarRole,
    ties: &TieSpec,
    member_length_m: f64,
    tie_length_m: f64,
    waste: f64,
    decimals: u32,
    explicit_item: Option<&str>,
) -> CalcResult<RebarCalc> {
    let size = ties.validate()?;
    let count = distributed_count(member_length_m, &BarLayout::Spacing(ties.spacing_m))?;
    Ok(weight_calc(role, size, count, tie_length_m, waste, decimals, explicit_item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_distributed_count() {
        assert_eq!(distributed_count(4.0, &BarLayout::Spacing(0.2)).unwrap(), 21);
        assert_eq!(distributed_count(3.0, &BarLayout::Spacing(0.1)).unwrap(), 31);
        assert_eq!(distributed_count(1.0, &BarLayout::Spacing(0.3)).unwrap(), 4);
        assert_eq!(distributed_count(9.9, &BarLayout::Count(6)).unwrap(), 6);
        assert!(distributed_count(1.0, &BarLayout::Spacing(0.0)).is_err());
    }

    #[test]
    fn test_bar_group_weight() {
        // 4-16mm bars, 4.64 m long (4.0 + 40d lap), no waste
        let calc = bar_group(
            RebarRole::Main,
            &BarGroup::count(16, 4),
            0.22,
            4.64,
            0.0,
            2,
            None,
        )
        .unwrap();
        let expected = 4.0 * 4.64 * 256.0 / 162.0;
        assert_abs_diff_eq!(calc.weight.quantity, round_to(expected, 2), epsilon = 1e-9);
        assert_eq!(calc.pay_item, "902 (1) a2");
        assert!(calc.assumptions.iter().any(|a| a == "DPWH Item: 902 (1) a2"));
    }

    #[test]
    fn test_explicit_item_wins() {
        let calc = bar_group(
            RebarRole::Secondary,
            &BarGroup::spacing(10, 0.2),
            2.0,
            3.0,
            0.03,
            2,
            Some("902 (1) b"),
        )
        .unwrap();
        assert_eq!(calc.bar_count, 11);
        assert_eq!(calc.pay_item, "902 (1) b");
    }

    #[test]
    fn test_tie_lengths() {
        // 300x500 with 40mm cover: 2 × (0.22 + 0.42) + 2 × 0.12
        let len = rectangular_tie_length(0.30, 0.50, 0.04, BarSize::D10);
        assert_abs_diff_eq!(len, 1.52, epsilon = 1e-9);
        let circ = circular_tie_length(0.40, 0.04, BarSize::D10);
        assert_abs_diff_eq!(circ, std::f64::consts::PI * 0.32 + 0.24, epsilon = 1e-9);
    }

    #[test]
    fn test_tie_group_count() {
        let calc = tie_group(
            RebarRole::Stirrup,
            &TieSpec { diameter_mm: 10, spacing_m: 0.15 },
            4.0,
            1.52,
            0.0,
            2,
            None,
        )
        .unwrap();
        // floor(4.0 / 0.15) + 1 = 27
        assert_eq!(calc.bar_count, 27);
        assert_eq!(calc.role, RebarRole::Stirrup);
        assert_eq!(calc.pay_item, "902 (1) a1");
    }
}
