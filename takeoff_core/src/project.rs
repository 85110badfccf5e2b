//! # Project Snapshot
//!
//! The `Project` struct is the root container handed to the takeoff pipeline.
//! Projects serialize to human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! Project
//! ├── meta: ProjectMetadata (version, estimator, job info, timestamps)
//! ├── settings: GlobalSettings (waste, rounding, default pay items)
//! ├── grid / levels (coordinate system)
//! ├── templates / instances (structural elements)
//! ├── spaces / openings / finish_types / space_finishes
//! ├── roof_types / roof_planes / trusses
//! └── schedule_items
//! ```
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::project::Project;
//!
//! let project = Project::new("Jane Estimator", "25-042", "ACME Corp");
//! let json = serde_json::to_string_pretty(&project).unwrap();
//! assert!(json.contains("900 (1) a"));
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calculations::finishes::{FinishType, Opening, Space, SpaceFinish};
use crate::calculations::roofing::{RoofPlane, RoofType};
use crate::calculations::schedule::ScheduleItem;
use crate::calculations::truss::TrussDesign;
use crate::calculations::{ElementInstance, ElementTemplate};
use crate::errors::{CalcError, CalcResult};
use crate::geometry::{GridSystem, Level, LevelStack};

/// Current schema version for project files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root project container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub meta: ProjectMetadata,

    #[serde(default)]
    pub settings: GlobalSettings,

    #[serde(default)]
    pub grid: GridSystem,

    #[serde(default)]
    pub levels: Vec<Level>,

    #[serde(default)]
    pub templates: Vec<ElementTemplate>,

    /// Placed elements, in the order their takeoff lines are emitted
    #[serde(default)]
    pub instances: Vec<ElementInstance>,

    #[serde(default)]
    pub spaces: Vec<Space>,

    #[serde(default)]
    pub openings: Vec<Opening>,

    #[serde(default)]
    pub finish_types: Vec<FinishType>,

    #[serde(default)]
    pub space_finishes: Vec<SpaceFinish>,

    #[serde(default)]
    pub roof_types: Vec<RoofType>,

    #[serde(default)]
    pub roof_planes: Vec<RoofPlane>,

    #[serde(default)]
    pub trusses: Vec<TrussDesign>,

    #[serde(default)]
    pub schedule_items: Vec<ScheduleItem>,
}

impl Project {
    /// Create a new empty project.
    ///
    /// # Example
    ///
    /// ```rust
    /// use takeoff_core::project::Project;
    ///
    /// let project = Project::new("John Doe", "25-001", "Client Corp");
    /// assert_eq!(project.meta.estimator, "John Doe");
    /// assert!(project.instances.is_empty());
    /// ```
    pub fn new(estimator: impl Into<String>, job_id: impl Into<String>, client: impl Into<String>) -> Self {
        let now = Utc::now();
        Project {
            meta: ProjectMetadata {
                version: SCHEMA_VERSION.to_string(),
                estimator: estimator.into(),
                job_id: job_id.into(),
                client: client.into(),
                created: now,
                modified: now,
            },
            settings: GlobalSettings::default(),
            grid: GridSystem::default(),
            levels: Vec::new(),
            templates: Vec::new(),
            instances: Vec::new(),
            spaces: Vec::new(),
            openings: Vec::new(),
            finish_types: Vec::new(),
            space_finishes: Vec::new(),
            roof_types: Vec::new(),
            roof_planes: Vec::new(),
            trusses: Vec::new(),
            schedule_items: Vec::new(),
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    pub fn level_stack(&self) -> LevelStack<'_> {
        LevelStack::new(&self.levels)
    }

    pub fn template(&self, id: &str) -> CalcResult<&ElementTemplate> {
        self.templates
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| CalcError::template_not_found(id))
    }

    pub fn finish_type(&self, id: &str) -> Option<&FinishType> {
        self.finish_types.iter().find(|f| f.id == id)
    }

    pub fn roof_type(&self, id: &str) -> Option<&RoofType> {
        self.roof_types.iter().find(|r| r.id == id)
    }

    pub fn space(&self, id: &str) -> Option<&Space> {
        self.spaces.iter().find(|s| s.id == id)
    }

    /// Structural problems that do not stop a takeoff: duplicate labels and ids,
    /// dangling references. Each is a human-readable message.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = self.grid.validate();
        problems.extend(self.level_stack().validate());
        problems.extend(self.settings.validate());

        problems.extend(duplicates("template", self.templates.iter().map(|t| t.id.as_str())));
        problems.extend(duplicates("instance", self.instances.iter().map(|i| i.id.as_str())));
        problems.extend(duplicates("space", self.spaces.iter().map(|s| s.id.as_str())));
        problems.extend(duplicates("roof plane", self.roof_planes.iter().map(|r| r.id.as_str())));

        for instance in &self.instances {
            if self.template(&instance.template_id).is_err() {
                problems.push(format!(
                    "Instance {} references unknown template '{}'",
                    instance.id, instance.template_id
                ));
            }
        }
        for assignment in &self.space_finishes {
            if self.space(&assignment.space_id).is_none() {
                problems.push(format!("Finish assignment references unknown space '{}'", assignment.space_id));
            }
            if self.finish_type(&assignment.finish_type_id).is_none() {
                problems.push(format!(
                    "Finish assignment references unknown finish type '{}'",
                    assignment.finish_type_id
                ));
            }
        }
        for plane in &self.roof_planes {
            if self.roof_type(&plane.roof_type_id).is_none() {
                problems.push(format!(
                    "Roof plane {} references unknown roof type '{}'",
                    plane.id, plane.roof_type_id
                ));
            }
        }
        problems
    }
}

fn duplicates<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| !seen.insert(*id))
        .map(|id| format!("Duplicate {} id '{}'", kind, id))
        .collect()
}

impl Default for Project {
    fn default() -> Self {
        Project::new("", "", "")
    }
}

/// Project metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Name of the responsible quantity surveyor / estimator
    #[serde(default)]
    pub estimator: String,

    /// Job/project number
    #[serde(default)]
    pub job_id: String,

    #[serde(default)]
    pub client: String,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}

/// Global project settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default)]
    pub waste: WasteSettings,

    #[serde(default)]
    pub rounding: RoundingSettings,

    #[serde(default)]
    pub default_pay_items: DefaultPayItems,

    /// Clear cover to reinforcement (m)
    #[serde(default = "default_cover")]
    pub concrete_cover_m: f64,
}

fn default_cover() -> f64 {
    0.04
}

impl Default for GlobalSettings {
    fn default() -> Self {
        GlobalSettings {
            waste: WasteSettings::default(),
            rounding: RoundingSettings::default(),
            default_pay_items: DefaultPayItems::default(),
            concrete_cover_m: default_cover(),
        }
    }
}

impl GlobalSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (name, value) in [("concrete", self.waste.concrete), ("rebar", self.waste.rebar)] {
            if !(value.is_finite() && value >= 0.0) {
                problems.push(format!("Waste factor for {} must be non-negative, got {}", name, value));
            }
        }
        if !(self.concrete_cover_m.is_finite() && self.concrete_cover_m >= 0.0) {
            problems.push(format!(
                "Concrete cover must be non-negative, got {}",
                self.concrete_cover_m
            ));
        }
        problems
    }
}

/// Waste ratios applied on top of net quantities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WasteSettings {
    #[serde(default = "default_concrete_waste")]
    pub concrete: f64,
    #[serde(default = "default_rebar_waste")]
    pub rebar: f64,
}

fn default_concrete_waste() -> f64 {
    0.05
}

fn default_rebar_waste() -> f64 {
    0.03
}

impl Default for WasteSettings {
    fn default() -> Self {
        WasteSettings {
            concrete: default_concrete_waste(),
            rebar: default_rebar_waste(),
        }
    }
}

/// Decimal places for takeoff-line quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingSettings {
    #[serde(default = "default_three")]
    pub concrete: u32,
    #[serde(default = "default_two")]
    pub rebar: u32,
    #[serde(default = "default_two")]
    pub formwork: u32,
    /// Finish and roof covering areas
    #[serde(default = "default_two")]
    pub area: u32,
}

fn default_three() -> u32 {
    3
}

fn default_two() -> u32 {
    2
}

impl Default for RoundingSettings {
    fn default() -> Self {
        RoundingSettings {
            concrete: 3,
            rebar: 2,
            formwork: 2,
            area: 2,
        }
    }
}

/// Pay items used when a template names none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultPayItems {
    #[serde(default = "default_concrete_item")]
    pub concrete: Option<String>,
    #[serde(default = "default_rebar_item")]
    pub rebar: Option<String>,
    #[serde(default = "default_formwork_item")]
    pub formwork: Option<String>,
}

fn default_concrete_item() -> Option<String> {
    Some("900 (1) a".to_string())
}

fn default_rebar_item() -> Option<String> {
    Some("902 (1) a1".to_string())
}

fn default_formwork_item() -> Option<String> {
    Some("903 (2)".to_string())
}

impl Default for DefaultPayItems {
    fn default() -> Self {
        DefaultPayItems {
            concrete: default_concrete_item(),
            rebar: default_rebar_item(),
            formwork: default_formwork_item(),
        }
    }
}
