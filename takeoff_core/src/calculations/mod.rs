//! # Quantity Calculations
//!
//! Every calculator in this module is a pure function of resolved geometry,
//! template dimensions, and waste/rounding parameters. Each returns the
//! quantity together with its working (`formula_text`) and the numbers that
//! went into it (`inputs`), so a takeoff line can always be re-checked by hand.
//!
//! ## Available Calculations
//!
//! - [`beam`] - Beam concrete, formwork (bottom + two sides), bars and stirrups
//! - [`slab`] - Suspended slab concrete, soffit formwork, two-way bars
//! - [`column`] - Rectangular and circular columns with ties
//! - [`foundation`] - Mat foundations and isolated footings
//! - [`rebar`] - Shared bar-count and bar-weight rules
//! - [`truss`] - Roof truss member synthesis
//! - [`finishes`] - Floor, wall, and ceiling finish areas per space
//! - [`roofing`] - Slope-adjusted roof covering areas
//! - [`schedule`] - Direct-quantity schedule items (doors, hardware, ...)

pub mod beam;
pub mod column;
pub mod finishes;
pub mod foundation;
pub mod rebar;
pub mod roofing;
pub mod schedule;
pub mod slab;
pub mod template;
pub mod truss;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::geometry::PlanRect;
use crate::materials::BarSize;
use crate::project::GlobalSettings;
use crate::units::Unit;

// Re-export commonly used types
pub use template::{
    BarGroup, BarLayout, ColumnShape, ElementInstance, ElementTemplate, ElementType,
    FoundationShape, Reinforcement, TemplateKind, TieSpec,
};
pub use truss::{TrussParameters, TrussResult, TrussType};

/// A derived quantity and its working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityCalc {
    pub quantity: f64,
    pub unit: Unit,
    pub formula_text: String,
    pub inputs: BTreeMap<String, f64>,
}

impl QuantityCalc {
    pub fn new(quantity: f64, unit: Unit, formula_text: impl Into<String>, inputs: &[(&str, f64)]) -> Self {
        QuantityCalc {
            quantity,
            unit,
            formula_text: formula_text.into(),
            inputs: inputs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

/// Role a bar group plays in its element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebarRole {
    Main,
    Secondary,
    Stirrup,
    Tie,
}

impl RebarRole {
    pub fn code(&self) -> &'static str {
        match self {
            RebarRole::Main => "main",
            RebarRole::Secondary => "secondary",
            RebarRole::Stirrup => "stirrup",
            RebarRole::Tie => "tie",
        }
    }
}

impl fmt::Display for RebarRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Weight of one bar group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebarCalc {
    pub role: RebarRole,
    pub bar_size: BarSize,
    pub bar_count: u32,
    pub bar_length_m: f64,
    pub weight: QuantityCalc,
    /// Governing DPWH item, from the template or inferred from diameter
    pub pay_item: String,
    pub assumptions: Vec<String>,
}

/// Everything one structural element contributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementQuantities {
    pub concrete: QuantityCalc,
    pub rebar: Vec<RebarCalc>,
    pub formwork: QuantityCalc,
}

/// Resolved geometry handed to a calculator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementGeometry {
    /// Member length along its axis (beams)
    Linear { length: f64 },
    /// Plan region (slabs, mats)
    Plan(PlanRect),
    /// Level-to-level height (columns)
    Vertical { height: f64 },
    /// Self-dimensioned element at a grid point (footings)
    Point,
}

impl ElementGeometry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ElementGeometry::Linear { .. } => "linear",
            ElementGeometry::Plan(_) => "plan",
            ElementGeometry::Vertical { .. } => "vertical",
            ElementGeometry::Point => "point",
        }
    }
}

/// Waste and rounding parameters for the element calculators
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalcParams {
    pub concrete_waste: f64,
    pub rebar_waste: f64,
    pub concrete_decimals: u32,
    pub rebar_decimals: u32,
    pub formwork_decimals: u32,
    pub cover_m: f64,
}

impl From<&GlobalSettings> for CalcParams {
    fn from(settings: &GlobalSettings) -> Self {
        CalcParams {
            concrete_waste: settings.waste.concrete,
            rebar_waste: settings.waste.rebar,
            concrete_decimals: settings.rounding.concrete,
            rebar_decimals: settings.rounding.rebar,
            formwork_decimals: settings.rounding.formwork,
            cover_m: settings.concrete_cover_m,
        }
    }
}

impl Default for CalcParams {
    fn default() -> Self {
        CalcParams::from(&GlobalSettings::default())
    }
}

/// Run the calculator family matching the template's kind.
///
/// The template is validated first; a geometry of the wrong shape for the
/// template (e.g. a plan region for a beam) is an input error. Dimensions
/// large enough to overflow a quantity fail the calculation.
pub fn calculate_element(
    template: &ElementTemplate,
    geometry: &ElementGeometry,
    params: &CalcParams,
) -> CalcResult<ElementQuantities> {
    template.validate()?;
    let rebar = template.reinforcement.as_ref();

    let quantities = match (template.kind, geometry) {
        (TemplateKind::Beam { width, height }, ElementGeometry::Linear { length }) => {
            beam::calculate(*length, width, height, rebar, params)
        }
        (TemplateKind::Slab { thickness }, ElementGeometry::Plan(rect)) => {
            slab::calculate(rect, thickness, rebar, params)
        }
        (TemplateKind::Column { shape }, ElementGeometry::Vertical { height }) => {
            column::calculate(&shape, *height, rebar, params)
        }
        (TemplateKind::Foundation { shape: FoundationShape::Mat { thickness } }, ElementGeometry::Plan(rect)) => {
            foundation::calculate_mat(rect, thickness, rebar, params)
        }
        (
            TemplateKind::Foundation {
                shape: FoundationShape::Footing { length, width, depth },
            },
            ElementGeometry::Point,
        ) => foundation::calculate_footing(length, width, depth, rebar, params),
        (_, geometry) => Err(CalcError::invalid_input(
            "placement",
            geometry.kind_name(),
            format!("placement does not fit a {} template", template.element_type().code()),
        )),
    }?;

    let overflowed = std::iter::once(&quantities.concrete)
        .chain(std::iter::once(&quantities.formwork))
        .chain(quantities.rebar.iter().map(|r| &r.weight))
        .find(|q| !q.quantity.is_finite());
    if let Some(q) = overflowed {
        return Err(CalcError::calculation_failed(
            template.element_type().code(),
            format!("non-finite quantity from {}", q.formula_text),
        ));
    }
    Ok(quantities)
}
