//! # Takeoff Aggregation
//!
//! Runs every calculator over a project snapshot and flattens the results into
//! one ordered stream of [`TakeoffLine`]s.
//!
//! ## Order
//!
//! Lines come out grouped by source, in project order:
//!
//! 1. Element instances (concrete, then each bar group, then formwork)
//! 2. Spaces (one line per assigned finish)
//! 3. Roof planes
//! 4. Trusses
//! 5. Schedule items
//!
//! ## Failure handling
//!
//! A source that cannot be computed (unknown grid label, missing template,
//! top-floor column with no end level...) contributes no lines and one message
//! to [`TakeoffResult::errors`]. Everything else still runs.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::project::Project;
//! use takeoff_core::takeoff::generate_takeoff;
//!
//! let project = Project::new("Estimator", "25-001", "Client");
//! let result = generate_takeoff(&project);
//! assert!(result.takeoff_lines.is_empty());
//! assert!(result.errors.is_empty());
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculations::finishes::{finish_area, space_geometry, FinishCategory, Space};
use crate::calculations::roofing::{covering_area, roof_plane_geometry, RoofPlane, RoofPlaneGeometry};
use crate::calculations::schedule::{item_quantity, ScheduleItem};
use crate::calculations::truss::{building_totals, synthesize, trusses_per_building, TrussDesign};
use crate::calculations::{
    calculate_element, CalcParams, ElementGeometry, ElementInstance, ElementType, QuantityCalc, RebarRole,
    TemplateKind,
};
use crate::errors::{CalcError, CalcResult};
use crate::geometry::{LevelStack, Placement};
use crate::project::Project;
use crate::units::{round_to, Unit};

/// Work category a takeoff or BOQ line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Trade {
    Concrete,
    Rebar,
    Formwork,
    Finishes,
    Roofing,
    #[serde(rename = "Schedule Items")]
    ScheduleItems,
}

impl Trade {
    pub const ALL: [Trade; 6] = [
        Trade::Concrete,
        Trade::Rebar,
        Trade::Formwork,
        Trade::Finishes,
        Trade::Roofing,
        Trade::ScheduleItems,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Trade::Concrete => "Concrete",
            Trade::Rebar => "Rebar",
            Trade::Formwork => "Formwork",
            Trade::Finishes => "Finishes",
            Trade::Roofing => "Roofing",
            Trade::ScheduleItems => "Schedule Items",
        }
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Structured classification of a takeoff line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub element_type: ElementType,
    /// Template name
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub rebar_role: Option<RebarRole>,
    #[serde(default)]
    pub finish_category: Option<FinishCategory>,
    /// Pay item carried from the source (template, reinforcement, finish type...)
    #[serde(default)]
    pub pay_item: Option<String>,
    /// Free-form tags copied from the source
    #[serde(default)]
    pub custom: Vec<String>,
}

impl Classification {
    pub fn new(element_type: ElementType) -> Self {
        Classification {
            element_type,
            template: None,
            level: None,
            rebar_role: None,
            finish_category: None,
            pay_item: None,
            custom: Vec::new(),
        }
    }

    /// Tags other than the element type and pay item
    pub fn descriptive_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if let Some(template) = &self.template {
            tags.push(format!("template:{}", template));
        }
        if let Some(level) = &self.level {
            tags.push(format!("level:{}", level));
        }
        if let Some(role) = self.rebar_role {
            tags.push(format!("rebar:{}", role));
        }
        if let Some(category) = self.finish_category {
            tags.push(format!("finish:{}", category.code()));
        }
        tags.extend(self.custom.iter().cloned());
        tags
    }

    /// Colon-delimited `key:value` display tags
    pub fn display_tags(&self) -> Vec<String> {
        let mut tags = vec![format!("type:{}", self.element_type.code())];
        tags.extend(self.descriptive_tags());
        if let Some(item) = &self.pay_item {
            tags.push(format!("dpwh:{}", item));
        }
        tags
    }
}

/// One computed quantity with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeoffLine {
    pub id: Uuid,
    pub source_element_id: String,
    pub trade: Trade,
    /// What is being measured, e.g. "concrete", "rebar_16mm_main"
    pub resource_key: String,
    pub quantity: f64,
    pub unit: Unit,
    pub formula_text: String,
    pub inputs_snapshot: BTreeMap<String, f64>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    pub classification: Classification,
    /// Derived from `classification`
    #[serde(default)]
    pub tags: Vec<String>,
    pub calculated_at: DateTime<Utc>,
}

/// Totals across a takeoff
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TakeoffSummary {
    /// cu.m
    pub total_concrete: f64,
    /// kg
    pub total_rebar: f64,
    /// sq.m
    pub total_formwork: f64,
    pub total_floor_area: f64,
    pub total_wall_area: f64,
    pub total_ceiling_area: f64,
    pub total_roof_area: f64,
    /// Distinct sources that produced at least one line
    pub element_count: usize,
    pub takeoff_line_count: usize,
}

impl TakeoffSummary {
    pub fn from_lines(lines: &[TakeoffLine]) -> Self {
        let mut summary = TakeoffSummary {
            takeoff_line_count: lines.len(),
            ..Default::default()
        };
        let mut sources = HashSet::new();
        for line in lines {
            sources.insert(line.source_element_id.as_str());
            let q = line.quantity;
            match (line.trade, line.classification.finish_category) {
                (Trade::Concrete, _) => summary.total_concrete += q,
                (Trade::Rebar, _) => summary.total_rebar += q,
                (Trade::Formwork, _) => summary.total_formwork += q,
                (Trade::Finishes, Some(FinishCategory::Floor)) => summary.total_floor_area += q,
                (Trade::Finishes, Some(FinishCategory::Wall)) => summary.total_wall_area += q,
                (Trade::Finishes, Some(FinishCategory::Ceiling)) => summary.total_ceiling_area += q,
                (Trade::Roofing, _) if line.unit == Unit::SquareMeter => summary.total_roof_area += q,
                _ => {}
            }
        }
        summary.element_count = sources.len();
        summary.total_concrete = round_to(summary.total_concrete, 3);
        for total in [
            &mut summary.total_rebar,
            &mut summary.total_formwork,
            &mut summary.total_floor_area,
            &mut summary.total_wall_area,
            &mut summary.total_ceiling_area,
            &mut summary.total_roof_area,
        ] {
            *total = round_to(*total, 2);
        }
        summary
    }
}

/// Output of [`generate_takeoff`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeoffResult {
    pub takeoff_lines: Vec<TakeoffLine>,
    pub summary: TakeoffSummary,
    /// One message per source that was skipped
    pub errors: Vec<String>,
    /// Project consistency problems that did not stop the run
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Resolved roof plane geometry keyed by plane id
    #[serde(default)]
    pub roof_geometry: BTreeMap<String, RoofPlaneGeometry>,
}

/// Lines and errors from one source
#[derive(Debug, Default)]
struct SourceOutcome {
    lines: Vec<TakeoffLine>,
    errors: Vec<String>,
    roof_geometry: Option<(String, RoofPlaneGeometry)>,
}

impl SourceOutcome {
    fn failed(message: String) -> Self {
        SourceOutcome {
            errors: vec![message],
            ..Default::default()
        }
    }
}

/// Shared, read-only state for one takeoff run
struct TakeoffContext<'a> {
    project: &'a Project,
    params: CalcParams,
    levels: LevelStack<'a>,
    calculated_at: DateTime<Utc>,
}

impl<'a> TakeoffContext<'a> {
    fn area_decimals(&self) -> u32 {
        self.project.settings.rounding.area
    }

    fn line(
        &self,
        source_element_id: &str,
        trade: Trade,
        resource_key: impl Into<String>,
        calc: QuantityCalc,
        assumptions: Vec<String>,
        classification: Classification,
    ) -> TakeoffLine {
        TakeoffLine {
            id: Uuid::new_v4(),
            source_element_id: source_element_id.to_string(),
            trade,
            resource_key: resource_key.into(),
            quantity: calc.quantity,
            unit: calc.unit,
            formula_text: calc.formula_text,
            inputs_snapshot: calc.inputs,
            assumptions,
            tags: classification.display_tags(),
            classification,
            calculated_at: self.calculated_at,
        }
    }
}

/// Compute every takeoff line for a project.
pub fn generate_takeoff(project: &Project) -> TakeoffResult {
    let ctx = TakeoffContext {
        project,
        params: CalcParams::from(&project.settings),
        levels: project.level_stack(),
        calculated_at: Utc::now(),
    };

    let warnings = project.validate();
    for warning in &warnings {
        tracing::warn!("takeoff: {}", warning);
    }

    // Each source family runs in parallel; collect keeps project order
    let mut outcomes: Vec<SourceOutcome> = project
        .instances
        .par_iter()
        .map(|instance| instance_outcome(&ctx, instance))
        .collect();
    outcomes.par_extend(project.spaces.par_iter().map(|space| space_outcome(&ctx, space)));
    outcomes.par_extend(project.roof_planes.par_iter().map(|plane| roof_outcome(&ctx, plane)));
    outcomes.par_extend(project.trusses.par_iter().map(|design| truss_outcome(&ctx, design)));
    outcomes.par_extend(project.schedule_items.par_iter().map(|item| schedule_outcome(&ctx, item)));

    let mut takeoff_lines = Vec::new();
    let mut errors = Vec::new();
    let mut roof_geometry = BTreeMap::new();
    for outcome in outcomes {
        takeoff_lines.extend(outcome.lines);
        for error in outcome.errors {
            tracing::warn!("takeoff: {}", error);
            errors.push(error);
        }
        if let Some((id, geometry)) = outcome.roof_geometry {
            roof_geometry.insert(id, geometry);
        }
    }

    let summary = TakeoffSummary::from_lines(&takeoff_lines);
    tracing::debug!(
        "takeoff: {} lines from {} sources, {} errors",
        summary.takeoff_line_count,
        summary.element_count,
        errors.len()
    );

    TakeoffResult {
        takeoff_lines,
        summary,
        errors,
        warnings,
        roof_geometry,
    }
}

// ============================================================================
// Element instances
// ============================================================================

/// Resolve an instance's placement into calculator geometry.
///
/// `Ok(None)` means a column on the top level with nothing above it.
fn resolve_geometry(
    ctx: &TakeoffContext,
    instance: &ElementInstance,
    kind: &TemplateKind,
) -> CalcResult<Option<(ElementGeometry, Vec<String>)>> {
    let grid = &ctx.project.grid;
    ctx.levels.get(&instance.level)?;

    let resolved = match (&instance.placement, kind) {
        (Placement::Span { axis, start, end }, _) => {
            let length = grid.span_length(*axis, start, end)?;
            let note = format!("Span {}-{} on axis {} = {:.3} m", start, end, axis, length);
            (ElementGeometry::Linear { length }, vec![note])
        }
        (Placement::Area { area }, _) => {
            let rect = grid.plan_rect(area)?;
            let note = format!(
                "Region {}-{} / {}-{} = {:.3} × {:.3} m",
                area.x[0], area.x[1], area.y[0], area.y[1], rect.length_x, rect.length_y
            );
            (ElementGeometry::Plan(rect), vec![note])
        }
        (placement @ Placement::Point { .. }, TemplateKind::Column { .. }) => {
            placement.resolve_point(grid)?;
            let span = match ctx.levels.vertical_span(&instance.level, instance.end_level.as_deref())? {
                Some(span) => span,
                None => return Ok(None),
            };
            let note = if span.end_inferred {
                format!(
                    "Height {} to next level {} = {:.3} m",
                    span.start_level, span.end_level, span.height
                )
            } else {
                format!("Height {} to {} = {:.3} m", span.start_level, span.end_level, span.height)
            };
            (ElementGeometry::Vertical { height: span.height }, vec![note])
        }
        (placement @ Placement::Point { .. }, _) => {
            placement.resolve_point(grid)?;
            (ElementGeometry::Point, Vec::new())
        }
    };
    Ok(Some(resolved))
}

fn instance_outcome(ctx: &TakeoffContext, instance: &ElementInstance) -> SourceOutcome {
    let fail = |e: CalcError| SourceOutcome::failed(format!("Instance {}: {}", instance.id, e));

    let template = match ctx.project.template(&instance.template_id) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    let (geometry, notes) = match resolve_geometry(ctx, instance, &template.kind) {
        Ok(Some(resolved)) => resolved,
        Ok(None) => {
            return SourceOutcome::failed(format!(
                "Instance {}: column on top level '{}' has no level above and no end level; skipped",
                instance.id, instance.level
            ))
        }
        Err(e) => return fail(e),
    };
    let quantities = match calculate_element(template, &geometry, &ctx.params) {
        Ok(q) => q,
        Err(e) => return fail(e),
    };

    let base = Classification {
        template: Some(template.name.clone()),
        level: Some(instance.level.clone()),
        custom: instance.tags.clone(),
        ..Classification::new(template.element_type())
    };
    let waste_note = |trade: &str, waste: f64| format!("{} waste {:.0}%", trade, waste * 100.0);

    let mut lines = Vec::with_capacity(2 + quantities.rebar.len());

    let mut assumptions = notes.clone();
    assumptions.push(waste_note("Concrete", ctx.params.concrete_waste));
    lines.push(ctx.line(
        &instance.id,
        Trade::Concrete,
        "concrete",
        quantities.concrete,
        assumptions,
        Classification {
            pay_item: template.pay_item.clone(),
            ..base.clone()
        },
    ));

    for rebar in quantities.rebar {
        let mut assumptions = rebar.assumptions;
        assumptions.push(waste_note("Rebar", ctx.params.rebar_waste));
        lines.push(ctx.line(
            &instance.id,
            Trade::Rebar,
            format!("rebar_{}mm_{}", rebar.bar_size.diameter_mm(), rebar.role),
            rebar.weight,
            assumptions,
            Classification {
                rebar_role: Some(rebar.role),
                pay_item: Some(rebar.pay_item),
                ..base.clone()
            },
        ));
    }

    lines.push(ctx.line(&instance.id, Trade::Formwork, "formwork", quantities.formwork, notes, base));

    SourceOutcome {
        lines,
        ..Default::default()
    }
}

// ============================================================================
// Spaces, roofs, trusses, schedule items
// ============================================================================

fn space_outcome(ctx: &TakeoffContext, space: &Space) -> SourceOutcome {
    let project = ctx.project;
    let geometry = match space_geometry(space, &project.openings, &project.grid, &ctx.levels) {
        Ok(g) => g,
        Err(e) => return SourceOutcome::failed(format!("Space {}: {}", space.id, e)),
    };

    let mut outcome = SourceOutcome::default();
    for assignment in project.space_finishes.iter().filter(|a| a.space_id == space.id) {
        let Some(finish) = project.finish_type(&assignment.finish_type_id) else {
            outcome.errors.push(format!(
                "Space {}: finish type '{}' not found",
                space.id, assignment.finish_type_id
            ));
            continue;
        };
        let calc = match finish_area(&geometry, finish, assignment.height_override_m, ctx.area_decimals()) {
            Ok(c) => c,
            Err(e) => {
                outcome.errors.push(format!("Space {}: {}", space.id, e));
                continue;
            }
        };

        let mut assumptions = Vec::new();
        if let Some(height) = geometry.height.filter(|_| geometry.height_inferred) {
            assumptions.push(format!("Height to next level above {} = {:.3} m", space.level, height));
        }
        if finish.category == FinishCategory::Wall && geometry.opening_area > 0.0 {
            assumptions.push(format!("Openings deducted: {:.3} sq.m", geometry.opening_area));
        }
        assumptions.push(format!("{} waste {:.0}%", finish.name, finish.waste * 100.0));

        let classification = Classification {
            template: Some(finish.name.clone()),
            level: Some(space.level.clone()),
            finish_category: Some(finish.category),
            pay_item: finish.pay_item.clone(),
            custom: space.tags.clone(),
            ..Classification::new(ElementType::Space)
        };
        outcome.lines.push(ctx.line(
            &space.id,
            Trade::Finishes,
            format!("finish:{}", finish.id),
            calc,
            assumptions,
            classification,
        ));
    }
    outcome
}

fn roof_outcome(ctx: &TakeoffContext, plane: &RoofPlane) -> SourceOutcome {
    let fail = |message: String| SourceOutcome::failed(format!("Roof plane {}: {}", plane.id, message));

    let geometry = match roof_plane_geometry(plane, &ctx.project.grid) {
        Ok(g) => g,
        Err(e) => return fail(e.to_string()),
    };
    let Some(roof_type) = ctx.project.roof_type(&plane.roof_type_id) else {
        return SourceOutcome {
            errors: vec![format!("Roof plane {}: roof type '{}' not found", plane.id, plane.roof_type_id)],
            roof_geometry: Some((plane.id.clone(), geometry)),
            ..Default::default()
        };
    };
    let calc = match covering_area(plane, &geometry, roof_type, ctx.area_decimals()) {
        Ok(c) => c,
        Err(e) => return fail(e.to_string()),
    };

    let classification = Classification {
        template: Some(roof_type.name.clone()),
        level: Some(plane.level.clone()),
        pay_item: roof_type.pay_item.clone(),
        ..Classification::new(ElementType::RoofPlane)
    };
    let assumptions = vec![
        format!("Eave overhang {:.3} m each side", plane.eave_overhang_m),
        format!("Slope factor {:.4}", geometry.slope_factor),
        format!("{} waste {:.0}%", roof_type.name, roof_type.waste * 100.0),
    ];
    SourceOutcome {
        lines: vec![ctx.line(
            &plane.id,
            Trade::Roofing,
            format!("roof:{}", roof_type.id),
            calc,
            assumptions,
            classification,
        )],
        errors: Vec::new(),
        roof_geometry: Some((plane.id.clone(), geometry)),
    }
}

fn truss_outcome(ctx: &TakeoffContext, design: &TrussDesign) -> SourceOutcome {
    let params = &design.parameters;
    let result = match synthesize(params) {
        Ok(r) => r,
        Err(e) => return SourceOutcome::failed(format!("Truss {}: {}", design.id, e)),
    };
    let count = trusses_per_building(design.building_length_mm, params.spacing_mm);
    let totals = building_totals(&result, count);

    let calc = QuantityCalc::new(
        round_to(totals.total_weight_kg, ctx.params.rebar_decimals),
        Unit::Kilogram,
        format!(
            "{} × ({:.2} + {:.2}) kg",
            count, result.weights.members_kg, result.weights.plates_kg
        ),
        &[
            ("truss_count", count as f64),
            ("span_mm", params.span_mm),
            ("rise_mm", params.rise_mm),
            ("spacing_mm", params.spacing_mm),
            ("building_length_mm", design.building_length_mm),
            ("members_kg", result.weights.members_kg),
            ("plates_kg", result.weights.plates_kg),
        ],
    );

    let mut assumptions = vec![
        format!(
            "{} truss, pitch {:.2}°, {} members, {} plates each",
            params.truss_type.display_name(),
            result.geometry.pitch_deg,
            result.geometry.member_count,
            result.plates.iter().map(|p| p.quantity).sum::<u32>()
        ),
        format!(
            "{} trusses at {:.0} mm over {:.0} mm",
            count, params.spacing_mm, design.building_length_mm
        ),
        format!("Steel volume {:.4} cu.m", totals.total_steel_volume_m3),
    ];
    assumptions.extend(result.warnings.iter().map(|w| format!("Warning: {}", w)));

    let classification = Classification {
        template: Some(design.name.clone()),
        level: design.level.clone(),
        pay_item: design.pay_item.clone(),
        custom: design.tags.clone(),
        ..Classification::new(ElementType::Truss)
    };
    SourceOutcome {
        lines: vec![ctx.line(
            &design.id,
            Trade::Roofing,
            "truss_steel",
            calc,
            assumptions,
            classification,
        )],
        ..Default::default()
    }
}

fn schedule_outcome(ctx: &TakeoffContext, item: &ScheduleItem) -> SourceOutcome {
    let calc = match item_quantity(item) {
        Ok(c) => c,
        Err(e) => return SourceOutcome::failed(format!("Schedule item {}: {}", item.id, e)),
    };
    let classification = Classification {
        template: Some(item.category.clone()),
        level: item.level.clone(),
        pay_item: item.pay_item.clone(),
        custom: item.tags.clone(),
        ..Classification::new(ElementType::ScheduleItem)
    };
    SourceOutcome {
        lines: vec![ctx.line(
            &item.id,
            Trade::ScheduleItems,
            format!("schedule:{}", item.mark),
            calc,
            vec![item.description.clone()],
            classification,
        )],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::finishes::{FinishType, SpaceFinish};
    use crate::calculations::roofing::{RoofSlope, RoofType};
    use crate::calculations::{BarGroup, ColumnShape, ElementTemplate, Reinforcement, TieSpec};
    use crate::geometry::{GridArea, GridAxis, GridLine, Level};

    fn project() -> Project {
        let mut p = Project::new("Estimator", "25-001", "Client");
        p.grid.x = vec![GridLine::new("A", 0.0), GridLine::new("B", 4.0)];
        p.grid.y = vec![GridLine::new("1", 0.0), GridLine::new("2", 5.0)];
        p.levels = vec![Level::new("GF", 0.0), Level::new("L2", 3.0)];
        p.templates = vec![
            ElementTemplate {
                id: "TB".to_string(),
                name: "B-300x500".to_string(),
                kind: TemplateKind::Beam { width: 0.3, height: 0.5 },
                reinforcement: Some(Reinforcement {
                    main: Some(BarGroup::count(16, 4)),
                    ties: Some(TieSpec { diameter_mm: 10, spacing_m: 0.15 }),
                    ..Default::default()
                }),
                pay_item: None,
            },
            ElementTemplate {
                id: "TC".to_string(),
                name: "C-400".to_string(),
                kind: TemplateKind::Column {
                    shape: ColumnShape::Rectangular { width: 0.4, height: 0.4 },
                },
                reinforcement: None,
                pay_item: Some("900 (1) c".to_string()),
            },
        ];
        p
    }

    fn beam(id: &str) -> ElementInstance {
        ElementInstance {
            id: id.to_string(),
            template_id: "TB".to_string(),
            level: "L2".to_string(),
            placement: Placement::Span {
                axis: GridAxis::X,
                start: "A".to_string(),
                end: "B".to_string(),
            },
            end_level: None,
            tags: vec!["zone:north".to_string()],
        }
    }

    fn column(id: &str, level: &str) -> ElementInstance {
        ElementInstance {
            id: id.to_string(),
            template_id: "TC".to_string(),
            level: level.to_string(),
            placement: Placement::Point {
                x: "A".to_string(),
                y: "1".to_string(),
            },
            end_level: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_beam_lines_in_order() {
        let mut p = project();
        p.instances.push(beam("B1"));
        let result = generate_takeoff(&p);
        assert!(result.errors.is_empty());
        let trades: Vec<Trade> = result.takeoff_lines.iter().map(|l| l.trade).collect();
        assert_eq!(trades, vec![Trade::Concrete, Trade::Rebar, Trade::Rebar, Trade::Formwork]);
        assert_eq!(result.takeoff_lines[0].quantity, 0.63);
        assert_eq!(result.takeoff_lines[1].resource_key, "rebar_16mm_main");
        assert_eq!(result.summary.element_count, 1);
    }

    #[test]
    fn test_tags_from_classification() {
        let mut p = project();
        p.instances.push(beam("B1"));
        let result = generate_takeoff(&p);
        let main = &result.takeoff_lines[1];
        assert_eq!(
            main.tags,
            vec![
                "type:beam",
                "template:B-300x500",
                "level:L2",
                "rebar:main",
                "zone:north",
                "dpwh:902 (1) a2"
            ]
        );
        assert_eq!(main.classification.pay_item.as_deref(), Some("902 (1) a2"));
    }

    #[test]
    fn test_column_height_from_next_level() {
        let mut p = project();
        p.instances.push(column("C1", "GF"));
        let result = generate_takeoff(&p);
        assert!(result.errors.is_empty());
        // 0.16 × 3.0 × 1.05
        assert_eq!(result.takeoff_lines[0].quantity, 0.504);
        assert!(result.takeoff_lines[0].assumptions[0].contains("next level L2"));
    }

    #[test]
    fn test_top_floor_column_skipped_once() {
        let mut p = project();
        p.instances.push(column("C9", "L2"));
        p.instances.push(beam("B1"));
        let result = generate_takeoff(&p);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("C9"));
        assert!(result.takeoff_lines.iter().all(|l| l.source_element_id == "B1"));
    }

    #[test]
    fn test_bad_grid_label_does_not_abort() {
        let mut p = project();
        let mut bad = beam("B2");
        bad.placement = Placement::Span {
            axis: GridAxis::X,
            start: "A".to_string(),
            end: "Q".to_string(),
        };
        p.instances.push(bad);
        p.instances.push(beam("B1"));
        let result = generate_takeoff(&p);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("'Q'"));
        assert_eq!(result.takeoff_lines.len(), 4);
    }

    #[test]
    fn test_finishes_and_roofing() {
        let mut p = project();
        p.spaces.push(Space {
            id: "S1".to_string(),
            name: "Hall".to_string(),
            level: "GF".to_string(),
            area: GridArea::new("A", "B", "1", "2"),
            height_m: None,
            tags: Vec::new(),
        });
        p.finish_types.push(FinishType {
            id: "F1".to_string(),
            name: "Paint".to_string(),
            category: FinishCategory::Wall,
            pay_item: Some("1032 (1) a".to_string()),
            waste: 0.0,
        });
        p.space_finishes.push(SpaceFinish {
            space_id: "S1".to_string(),
            finish_type_id: "F1".to_string(),
            height_override_m: None,
        });
        p.roof_types.push(RoofType {
            id: "RT1".to_string(),
            name: "Long span".to_string(),
            pay_item: Some("1014 (1) b".to_string()),
            waste: 0.0,
        });
        p.roof_planes.push(RoofPlane {
            id: "R1".to_string(),
            name: "Roof".to_string(),
            level: "L2".to_string(),
            area: GridArea::new("A", "B", "1", "2"),
            eave_overhang_m: 0.0,
            slope: RoofSlope::Degrees(0.0),
            roof_type_id: "RT1".to_string(),
            computed: None,
        });

        let result = generate_takeoff(&p);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.summary.total_wall_area, 54.0);
        assert_eq!(result.summary.total_roof_area, 20.0);
        assert!(result.roof_geometry.contains_key("R1"));
        assert_eq!(result.takeoff_lines[0].tags.last().map(String::as_str), Some("dpwh:1032 (1) a"));
    }

    #[test]
    fn test_missing_template_reported() {
        let mut p = project();
        let mut orphan = beam("B3");
        orphan.template_id = "nope".to_string();
        p.instances.push(orphan);
        let result = generate_takeoff(&p);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.takeoff_lines.is_empty());
    }

    #[test]
    fn test_every_source_family_keeps_project_order() {
        let mut p = project();
        for i in 0..40 {
            p.schedule_items.push(ScheduleItem {
                id: format!("SI{}", i),
                mark: format!("W{}", i),
                category: "windows".to_string(),
                description: "Sliding window".to_string(),
                quantity: i as f64,
                unit: Unit::Set,
                pay_item: None,
                level: None,
                tags: Vec::new(),
            });
        }
        p.instances.push(beam("B1"));

        let result = generate_takeoff(&p);
        let sources: Vec<&str> = result.takeoff_lines.iter().map(|l| l.source_element_id.as_str()).collect();
        let mut expected = vec!["B1"; 4];
        let ids: Vec<String> = (0..40).map(|i| format!("SI{}", i)).collect();
        expected.extend(ids.iter().map(String::as_str));
        assert_eq!(sources, expected);
    }

    #[test]
    fn test_top_level_space_keeps_floor_finish() {
        let mut p = project();
        p.spaces.push(Space {
            id: "S-TOP".to_string(),
            name: "Roof deck".to_string(),
            level: "L2".to_string(),
            area: GridArea::new("A", "B", "1", "2"),
            height_m: None,
            tags: Vec::new(),
        });
        p.finish_types.push(FinishType {
            id: "FL".to_string(),
            name: "Floor tiles".to_string(),
            category: FinishCategory::Floor,
            pay_item: Some("1018 (1)".to_string()),
            waste: 0.0,
        });
        p.finish_types.push(FinishType {
            id: "WL".to_string(),
            name: "Paint".to_string(),
            category: FinishCategory::Wall,
            pay_item: Some("1032 (1) a".to_string()),
            waste: 0.0,
        });
        for finish in ["FL", "WL"] {
            p.space_finishes.push(SpaceFinish {
                space_id: "S-TOP".to_string(),
                finish_type_id: finish.to_string(),
                height_override_m: None,
            });
        }

        let result = generate_takeoff(&p);
        assert_eq!(result.takeoff_lines.len(), 1);
        assert_eq!(result.takeoff_lines[0].resource_key, "finish:FL");
        assert_eq!(result.takeoff_lines[0].quantity, 20.0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("S-TOP"));
        assert!(result.errors[0].contains("WL"));
    }
}
