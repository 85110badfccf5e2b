//! # Element Templates and Instances
//!
//! A template is a reusable section definition ("B-300x500 with 4-16mm bars");
//! an instance places a template on the grid at a level. Shapes are explicit
//! variants rather than inferred from whichever dimension fields happen to be
//! filled in.
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "id": "T-B1",
//!   "name": "B-300x500",
//!   "kind": { "type": "beam", "width": 0.30, "height": 0.50 },
//!   "reinforcement": {
//!     "main": { "diameter_mm": 16, "count": 4 },
//!     "ties": { "diameter_mm": 10, "spacing_m": 0.15 }
//!   },
//!   "pay_item": "900 (1) a"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::geometry::Placement;
use crate::materials::BarSize;

/// Column cross-section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnShape {
    Rectangular { width: f64, height: f64 },
    Circular { diameter: f64 },
}

/// Foundation form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoundationShape {
    /// Mat / raft slab, plan area taken from placement
    Mat { thickness: f64 },
    /// Isolated footing with its own plan dimensions
    Footing { length: f64, width: f64, depth: f64 },
}

/// Kind-specific section dimensions (metres)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateKind {
    Beam { width: f64, height: f64 },
    Slab { thickness: f64 },
    Column { shape: ColumnShape },
    Foundation { shape: FoundationShape },
}

/// How a bar group is laid out: a fixed count or a centre-to-centre spacing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarLayout {
    Count(u32),
    #[serde(rename = "spacing_m")]
    Spacing(f64),
}

/// A group of longitudinal bars of one diameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarGroup {
    pub diameter_mm: u32,
    #[serde(flatten)]
    pub layout: BarLayout,
}

impl BarGroup {
    pub fn count(diameter_mm: u32, count: u32) -> Self {
        BarGroup {
            diameter_mm,
            layout: BarLayout::Count(count),
        }
    }

    pub fn spacing(diameter_mm: u32, spacing_m: f64) -> Self {
        BarGroup {
            diameter_mm,
            layout: BarLayout::Spacing(spacing_m),
        }
    }
}

/// Stirrups (beams) or ties (columns)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TieSpec {
    pub diameter_mm: u32,
    pub spacing_m: f64,
}

/// Reinforcement configuration of a template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reinforcement {
    #[serde(default)]
    pub main: Option<BarGroup>,
    #[serde(default)]
    pub secondary: Option<BarGroup>,
    #[serde(default)]
    pub ties: Option<TieSpec>,
    /// Governing DPWH item for every bar group; inferred from diameter when absent
    #[serde(default)]
    pub pay_item: Option<String>,
}

/// Reusable element definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementTemplate {
    pub id: String,
    pub name: String,
    pub kind: TemplateKind,
    #[serde(default)]
    pub reinforcement: Option<Reinforcement>,
    /// Explicit concrete pay item
    #[serde(default)]
    pub pay_item: Option<String>,
}

fn require_positive(field: &str, value: f64) -> CalcResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(CalcError::invalid_input(
            field,
            value.to_string(),
            "Dimension must be positive",
        ));
    }
    Ok(())
}

impl BarGroup {
    pub fn validate(&self, field: &str) -> CalcResult<BarSize> {
        let size = BarSize::from_diameter(self.diameter_mm)?;
        match self.layout {
            BarLayout::Count(0) => Err(CalcError::invalid_input(
                format!("{}.count", field),
                "0",
                "Bar count must be at least 1",
            )),
            BarLayout::Count(_) => Ok(size),
            BarLayout::Spacing(s) => {
                require_positive(&format!("{}.spacing_m", field), s)?;
                Ok(size)
            }
        }
    }
}

impl TieSpec {
    pub fn validate(&self) -> CalcResult<BarSize> {
        let size = BarSize::from_diameter(self.diameter_mm)?;
        require_positive("ties.spacing_m", self.spacing_m)?;
        Ok(size)
    }
}

impl ElementTemplate {
    /// Validate dimensions and reinforcement.
    pub fn validate(&self) -> CalcResult<()> {
        match self.kind {
            TemplateKind::Beam { width, height } => {
                require_positive("width", width)?;
                require_positive("height", height)?;
            }
            TemplateKind::Slab { thickness } => require_positive("thickness", thickness)?,
            TemplateKind::Column { shape } => match shape {
                ColumnShape::Rectangular { width, height } => {
                    require_positive("width", width)?;
                    require_positive("height", height)?;
                }
                ColumnShape::Circular { diameter } => require_positive("diameter", diameter)?,
            },
            TemplateKind::Foundation { shape } => match shape {
                FoundationShape::Mat { thickness } => require_positive("thickness", thickness)?,
                FoundationShape::Footing { length, width, depth } => {
                    require_positive("length", length)?;
                    require_positive("width", width)?;
                    require_positive("depth", depth)?;
                }
            },
        }

        if let Some(rebar) = &self.reinforcement {
            if let Some(main) = &rebar.main {
                main.validate("main")?;
            }
            if let Some(secondary) = &rebar.secondary {
                secondary.validate("secondary")?;
            }
            if let Some(ties) = &rebar.ties {
                ties.validate()?;
            }
        }
        Ok(())
    }

    /// Element type this template produces
    pub fn element_type(&self) -> ElementType {
        match self.kind {
            TemplateKind::Beam { .. } => ElementType::Beam,
            TemplateKind::Slab { .. } => ElementType::Slab,
            TemplateKind::Column { .. } => ElementType::Column,
            TemplateKind::Foundation { shape: FoundationShape::Mat { .. } } => ElementType::Mat,
            TemplateKind::Foundation { shape: FoundationShape::Footing { .. } } => ElementType::Footing,
        }
    }
}

/// Every kind of source that can produce takeoff lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Beam,
    Slab,
    Column,
    Footing,
    Mat,
    Space,
    RoofPlane,
    Truss,
    ScheduleItem,
}

impl ElementType {
    pub fn code(&self) -> &'static str {
        match self {
            ElementType::Beam => "beam",
            ElementType::Slab => "slab",
            ElementType::Column => "column",
            ElementType::Footing => "footing",
            ElementType::Mat => "mat",
            ElementType::Space => "space",
            ElementType::RoofPlane => "roof_plane",
            ElementType::Truss => "truss",
            ElementType::ScheduleItem => "schedule_item",
        }
    }
}

/// A template placed on the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInstance {
    pub id: String,
    pub template_id: String,
    /// Level label the element sits on (bottom level for columns)
    pub level: String,
    pub placement: Placement,
    /// Top level for columns; defaults to the next level above
    #[serde(default)]
    pub end_level: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beam_template() -> ElementTemplate {
        ElementTemplate {
            id: "T1".to_string(),
            name: "B-300x500".to_string(),
            kind: TemplateKind::Beam { width: 0.30, height: 0.50 },
            reinforcement: Some(Reinforcement {
                main: Some(BarGroup::count(16, 4)),
                ties: Some(TieSpec { diameter_mm: 10, spacing_m: 0.15 }),
                ..Default::default()
            }),
            pay_item: None,
        }
    }

    #[test]
    fn test_valid_template() {
        assert!(beam_template().validate().is_ok());
        assert_eq!(beam_template().element_type(), ElementType::Beam);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut t = beam_template();
        t.kind = TemplateKind::Beam { width: 0.0, height: 0.5 };
        let err = t.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_bad_bar_rejected() {
        let mut t = beam_template();
        t.reinforcement = Some(Reinforcement {
            main: Some(BarGroup::count(16, 0)),
            ..Default::default()
        });
        assert!(t.validate().is_err());
        t.reinforcement = Some(Reinforcement {
            secondary: Some(BarGroup::spacing(15, 0.2)),
            ..Default::default()
        });
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_template_json_shape() {
        let json = r#"{
            "id": "T-C1",
            "name": "C-400 round",
            "kind": { "type": "column", "shape": { "circular": { "diameter": 0.4 } } },
            "reinforcement": {
                "main": { "diameter_mm": 20, "count": 8 },
                "secondary": { "diameter_mm": 12, "spacing_m": 0.2 }
            }
        }"#;
        let t: ElementTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(t.element_type(), ElementType::Column);
        let rebar = t.reinforcement.unwrap();
        assert_eq!(rebar.main, Some(BarGroup::count(20, 8)));
        assert_eq!(rebar.secondary, Some(BarGroup::spacing(12, 0.2)));
        assert!(t.pay_item.is_none());
    }

    #[test]
    fn test_foundation_element_types() {
        let mut t = beam_template();
        t.kind = TemplateKind::Foundation {
            shape: FoundationShape::Mat { thickness: 0.4 },
        };
        assert_eq!(t.element_type(), ElementType::Mat);
        t.kind = TemplateKind::Foundation {
            shape: FoundationShape::Footing { length: 1.5, width: 1.5, depth: 0.4 },
        };
        assert_eq!(t.element_type(), ElementType::Footing);
    }
}
