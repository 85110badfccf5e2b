//! # Finishes
//!
//! Floor, wall, and ceiling areas for a space bounded by a grid region.
//!
//! - Floor and ceiling: the plan area
//! - Walls: `perimeter × height - openings`, never negative
//!
//! A space's height is explicit, or the height to the next level above its own.
//! A top-level space without either still gets floor and ceiling finishes;
//! only its wall finishes fail. Each assigned finish type then applies its
//! waste factor to the matching area.

use serde::{Deserialize, Serialize};

use crate::calculations::QuantityCalc;
use crate::errors::{CalcError, CalcResult};
use crate::geometry::{GridArea, GridSystem, LevelStack, PlanRect};
use crate::units::{round_to, Unit};

/// A room or zone receiving finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    pub name: String,
    pub level: String,
    pub area: GridArea,
    /// Floor-to-ceiling height; defaults to the storey height
    #[serde(default)]
    pub height_m: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Door or window opening deducted from wall area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    pub id: String,
    pub space_id: String,
    /// Free-form kind, e.g. "door", "window"
    pub kind: String,
    pub width_m: f64,
    pub height_m: f64,
    #[serde(default = "default_opening_count")]
    pub count: u32,
}

fn default_opening_count() -> u32 {
    1
}

impl Opening {
    pub fn area(&self) -> f64 {
        self.width_m * self.height_m * self.count as f64
    }
}

/// Surface a finish applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishCategory {
    Floor,
    Wall,
    Ceiling,
}

impl FinishCategory {
    pub fn code(&self) -> &'static str {
        match self {
            FinishCategory::Floor => "floor",
            FinishCategory::Wall => "wall",
            FinishCategory::Ceiling => "ceiling",
        }
    }
}

/// A finish material (tiles, paint, board ceiling...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishType {
    pub id: String,
    pub name: String,
    pub category: FinishCategory,
    #[serde(default)]
    pub pay_item: Option<String>,
    #[serde(default)]
    pub waste: f64,
}

/// Assignment of a finish type to a space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceFinish {
    pub space_id: String,
    pub finish_type_id: String,
    /// Wall finishes only: finish height below the space height (wainscot)
    #[serde(default)]
    pub height_override_m: Option<f64>,
}

/// Resolved surfaces of one space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceGeometry {
    pub plan: PlanRect,
    /// `None` for a top-level space with no explicit height
    pub height: Option<f64>,
    pub height_inferred: bool,
    pub floor_area: f64,
    pub ceiling_area: f64,
    pub gross_wall_area: Option<f64>,
    pub opening_area: f64,
    pub net_wall_area: Option<f64>,
}

fn wall_area(perimeter: f64, height: f64, opening_area: f64) -> f64 {
    (perimeter * height - opening_area).max(0.0)
}

/// Resolve floor, ceiling, and wall areas for a space.
///
/// `openings` may hold openings of other spaces; only this space's are deducted.
pub fn space_geometry(
    space: &Space,
    openings: &[Opening],
    grid: &GridSystem,
    levels: &LevelStack,
) -> CalcResult<SpaceGeometry> {
    let plan = grid.plan_rect(&space.area)?;
    if !(plan.area() > 0.0) {
        return Err(CalcError::invalid_geometry(
            format!("space {}", space.id),
            "grid region has no area",
        ));
    }

    let (height, height_inferred) = match space.height_m {
        Some(h) if h > 0.0 => (Some(h), false),
        Some(h) => {
            return Err(CalcError::invalid_input(
                format!("space {} height_m", space.id),
                h.to_string(),
                "Must be positive",
            ))
        }
        None => match levels.vertical_span(&space.level, None)? {
            Some(span) => (Some(span.height), true),
            None => (None, false),
        },
    };

    let opening_area: f64 = openings
        .iter()
        .filter(|o| o.space_id == space.id)
        .map(Opening::area)
        .sum();
    let perimeter = plan.perimeter();

    Ok(SpaceGeometry {
        plan,
        height,
        height_inferred,
        floor_area: plan.area(),
        ceiling_area: plan.area(),
        gross_wall_area: height.map(|h| perimeter * h),
        opening_area,
        net_wall_area: height.map(|h| wall_area(perimeter, h, opening_area)),
    })
}

/// Area of one finish on one space, with waste applied.
///
/// A wall finish needs a height: the override, else the space height.
pub fn finish_area(
    geometry: &SpaceGeometry,
    finish: &FinishType,
    height_override: Option<f64>,
    decimals: u32,
) -> CalcResult<QuantityCalc> {
    if !(finish.waste >= 0.0) {
        return Err(CalcError::invalid_input(
            format!("finish type {} waste", finish.id),
            finish.waste.to_string(),
            "Cannot be negative",
        ));
    }
    let waste = finish.waste;
    let plan = &geometry.plan;

    let calc = match finish.category {
        FinishCategory::Floor | FinishCategory::Ceiling => {
            let area = plan.area();
            QuantityCalc::new(
                round_to(area * (1.0 + waste), decimals),
                Unit::SquareMeter,
                format!("{:.3} × {:.3} × (1 + {})", plan.length_x, plan.length_y, waste),
                &[("length_x", plan.length_x), ("length_y", plan.length_y), ("waste", waste)],
            )
        }
        FinishCategory::Wall => {
            let height = match (height_override, geometry.height) {
                (Some(h), Some(space_height)) if h > 0.0 => h.min(space_height),
                (Some(h), None) if h > 0.0 => h,
                (Some(h), _) => {
                    return Err(CalcError::invalid_input(
                        "height_override_m",
                        h.to_string(),
                        "Must be positive",
                    ))
                }
                (None, Some(space_height)) => space_height,
                (None, None) => {
                    return Err(CalcError::invalid_geometry(
                        format!("wall finish {}", finish.id),
                        "space has no height given and no level above",
                    ))
                }
            };
            let perimeter = plan.perimeter();
            let net = wall_area(perimeter, height, geometry.opening_area);
            QuantityCalc::new(
                round_to(net * (1.0 + waste), decimals),
                Unit::SquareMeter,
                format!(
                    "max({:.3} × {:.3} - {:.3}, 0) × (1 + {})",
                    perimeter, height, geometry.opening_area, waste
                ),
                &[
                    ("perimeter", perimeter),
                    ("height", height),
                    ("opening_area", geometry.opening_area),
                    ("waste", waste),
                ],
            )
        }
    };
    Ok(calc)
}
