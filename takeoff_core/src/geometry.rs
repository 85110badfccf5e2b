//! # Geometry Resolver
//!
//! Turns grid-line labels and level labels into numbers. Every quantity in a
//! takeoff starts here: beam spans come from two grid lines on one axis, slab
//! and space areas from a rectangular grid region, column heights from a pair
//! of levels.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::geometry::{GridAxis, GridLine, GridSystem};
//!
//! let grid = GridSystem {
//!     x: vec![GridLine::new("A", 0.0), GridLine::new("B", 4.0)],
//!     y: vec![GridLine::new("1", 0.0), GridLine::new("2", 6.0)],
//! };
//!
//! assert_eq!(grid.span_length(GridAxis::X, "A", "B").unwrap(), 4.0);
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

// ============================================================================
// Grid
// ============================================================================

/// Grid axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridAxis {
    X,
    Y,
}

impl fmt::Display for GridAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridAxis::X => write!(f, "x"),
            GridAxis::Y => write!(f, "y"),
        }
    }
}

/// A single grid line: a label and its signed offset in metres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLine {
    pub label: String,
    pub offset: f64,
}

impl GridLine {
    pub fn new(label: impl Into<String>, offset: f64) -> Self {
        GridLine {
            label: label.into(),
            offset,
        }
    }
}

/// Two-axis structural grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridSystem {
    #[serde(default)]
    pub x: Vec<GridLine>,
    #[serde(default)]
    pub y: Vec<GridLine>,
}

/// A rectangular region bounded by two lines on each axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridArea {
    pub x: [String; 2],
    pub y: [String; 2],
}

impl GridArea {
    pub fn new(x1: impl Into<String>, x2: impl Into<String>, y1: impl Into<String>, y2: impl Into<String>) -> Self {
        GridArea {
            x: [x1.into(), x2.into()],
            y: [y1.into(), y2.into()],
        }
    }
}

/// Resolved plan dimensions of a rectangular region (metres)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanRect {
    pub length_x: f64,
    pub length_y: f64,
}

impl PlanRect {
    pub fn area(&self) -> f64 {
        self.length_x * self.length_y
    }

    pub fn perimeter(&self) -> f64 {
        2.0 * (self.length_x + self.length_y)
    }
}

impl GridSystem {
    fn lines(&self, axis: GridAxis) -> &[GridLine] {
        match axis {
            GridAxis::X => &self.x,
            GridAxis::Y => &self.y,
        }
    }

    /// Offset of a grid line, or `GridLabelNotFound`
    pub fn offset(&self, axis: GridAxis, label: &str) -> CalcResult<f64> {
        self.lines(axis)
            .iter()
            .find(|line| line.label == label)
            .map(|line| line.offset)
            .ok_or_else(|| CalcError::grid_label_not_found(axis.to_string(), label))
    }

    /// Span length between two lines on one axis: `|offset2 - offset1|`
    pub fn span_length(&self, axis: GridAxis, start: &str, end: &str) -> CalcResult<f64> {
        let a = self.offset(axis, start)?;
        let b = self.offset(axis, end)?;
        Ok((b - a).abs())
    }

    /// Plan dimensions of a grid region: `|x2-x1|` by `|y2-y1|`
    pub fn plan_rect(&self, area: &GridArea) -> CalcResult<PlanRect> {
        Ok(PlanRect {
            length_x: self.span_length(GridAxis::X, &area.x[0], &area.x[1])?,
            length_y: self.span_length(GridAxis::Y, &area.y[0], &area.y[1])?,
        })
    }

    /// Area of a grid region
    pub fn area(&self, area: &GridArea) -> CalcResult<f64> {
        Ok(self.plan_rect(area)?.area())
    }

    /// Report duplicate labels within an axis.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for axis in [GridAxis::X, GridAxis::Y] {
            let mut seen = HashSet::new();
            for line in self.lines(axis) {
                if !seen.insert(line.label.as_str()) {
                    problems.push(format!("Duplicate grid label '{}' on axis {}", line.label, axis));
                }
                if !line.offset.is_finite() {
                    problems.push(format!("Grid line '{}' on axis {} has a non-finite offset", line.label, axis));
                }
            }
        }
        problems
    }
}

// ============================================================================
// Levels
// ============================================================================

/// A building level (storey) and its elevation in metres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub label: String,
    pub elevation: f64,
}

impl Level {
    pub fn new(label: impl Into<String>, elevation: f64) -> Self {
        Level {
            label: label.into(),
            elevation,
        }
    }
}

/// Levels sorted by ascending elevation.
#[derive(Debug, Clone)]
pub struct LevelStack<'a> {
    sorted: Vec<&'a Level>,
}

/// Resolved vertical extent between two levels
#[derive(Debug, Clone, PartialEq)]
pub struct VerticalSpan {
    pub start_level: String,
    pub end_level: String,
    pub height: f64,
    /// True when the end level was picked as "next level above"
    pub end_inferred: bool,
}

impl<'a> LevelStack<'a> {
    pub fn new(levels: &'a [Level]) -> Self {
        let mut sorted: Vec<&Level> = levels.iter().collect();
        sorted.sort_by(|a, b| a.elevation.total_cmp(&b.elevation));
        LevelStack { sorted }
    }

    pub fn get(&self, label: &str) -> CalcResult<&'a Level> {
        self.sorted
            .iter()
            .copied()
            .find(|level| level.label == label)
            .ok_or_else(|| CalcError::level_not_found(label))
    }

    pub fn elevation(&self, label: &str) -> CalcResult<f64> {
        Ok(self.get(label)?.elevation)
    }

    /// First level strictly above `label`, or `None` on the top level.
    pub fn next_above(&self, label: &str) -> CalcResult<Option<&'a Level>> {
        let current = self.get(label)?;
        Ok(self
            .sorted
            .iter()
            .copied()
            .find(|level| level.elevation > current.elevation))
    }

    /// `elevation(end) - elevation(start)`, which must be strictly positive.
    pub fn height_between(&self, start: &str, end: &str) -> CalcResult<f64> {
        let height = self.elevation(end)? - self.elevation(start)?;
        if height <= 0.0 {
            return Err(CalcError::invalid_geometry(
                format!("levels {} -> {}", start, end),
                format!("level height {:.3} m must be positive", height),
            ));
        }
        Ok(height)
    }

    /// Resolve the vertical extent for an element placed on `start`.
    ///
    /// With no explicit end level the next level above is used. Returns
    /// `Ok(None)` when `start` is the top level and nothing is above it.
    pub fn vertical_span(&self, start: &str, end: Option<&str>) -> CalcResult<Option<VerticalSpan>> {
        let (end_label, end_inferred) = match end {
            Some(label) => (label.to_string(), false),
            None => match self.next_above(start)? {
                Some(level) => (level.label.clone(), true),
                None => return Ok(None),
            },
        };
        let height = self.height_between(start, &end_label)?;
        Ok(Some(VerticalSpan {
            start_level: start.to_string(),
            end_level: end_label,
            height,
            end_inferred,
        }))
    }

    /// Report duplicate level labels.
    pub fn validate(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sorted
            .iter()
            .filter(|level| !seen.insert(level.label.as_str()))
            .map(|level| format!("Duplicate level label '{}'", level.label))
            .collect()
    }
}

// ============================================================================
// Placement
// ============================================================================

/// Where an element instance sits on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Between two lines on one axis (beams)
    Span {
        axis: GridAxis,
        start: String,
        end: String,
    },
    /// Rectangular grid region (slabs, mats)
    Area { area: GridArea },
    /// Grid intersection (columns, footings)
    Point { x: String, y: String },
}

impl Placement {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Placement::Span { .. } => "span",
            Placement::Area { .. } => "area",
            Placement::Point { .. } => "point",
        }
    }

    /// Validate that a point placement resolves on both axes.
    pub fn resolve_point(&self, grid: &GridSystem) -> CalcResult<(f64, f64)> {
        match self {
            Placement::Point { x, y } => Ok((grid.offset(GridAxis::X, x)?, grid.offset(GridAxis::Y, y)?)),
            other => Err(CalcError::invalid_input(
                "placement",
                other.kind_name(),
                "expected a point placement",
            )),
        }
    }
}
