//! Direct-quantity schedule items (doors, windows, hardware, fixtures).
//!
//! Quantities are counted by the estimator, so each item passes straight
//! through to one takeoff line.

use serde::{Deserialize, Serialize};

use crate::calculations::QuantityCalc;
use crate::errors::{CalcError, CalcResult};
use crate::units::Unit;

/// A counted item from a door, window, or hardware schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub id: String,
    /// Schedule mark, e.g. "D1"
    pub mark: String,
    /// e.g. "doors", "windows", "hardware"
    pub category: String,
    pub description: String,
    pub quantity: f64,
    pub unit: Unit,
    #[serde(default)]
    pub pay_item: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub fn item_quantity(item: &ScheduleItem) -> CalcResult<QuantityCalc> {
    if !(item.quantity.is_finite() && item.quantity >= 0.0) {
        return Err(CalcError::invalid_input(
            format!("schedule item {} quantity", item.id),
            item.quantity.to_string(),
            "Cannot be negative",
        ));
    }
    Ok(QuantityCalc::new(
        item.quantity,
        item.unit,
        format!("{} {} ({})", item.quantity, item.unit, item.mark),
        &[("quantity", item.quantity)],
    ))
}
