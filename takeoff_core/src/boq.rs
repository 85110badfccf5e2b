//! # BOQ Mapping
//!
//! Groups takeoff lines by `(trade, pay item)` and sums each group into one
//! [`BoqLine`].
//!
//! ## Pay item resolution
//!
//! | Trade              | Item used                                          |
//! |--------------------|----------------------------------------------------|
//! | Concrete           | template item, else `default_pay_items.concrete`   |
//! | Rebar              | reinforcement / bar-grade item, else `default_pay_items.rebar` |
//! | Formwork           | `default_pay_items.formwork` (skipped with a warning if unset) |
//! | Finishes, Roofing, Schedule Items | the source's item; lines without one are dropped with a warning |
//!
//! Every fallback goes through [`resolve_pay_item`]. Warnings are reported
//! once per distinct message.
//!
//! A group whose item is missing from the catalog is an error and produces no
//! BOQ line; the rest of the BOQ is still built.

use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculations::ElementType;
use crate::catalog::PayItemCatalog;
use crate::errors::{CalcError, CalcResult};
use crate::project::{DefaultPayItems, Project};
use crate::takeoff::{TakeoffLine, Trade};
use crate::units::{round_to, Unit};

/// One pay item of the bill of quantities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoqLine {
    pub id: Uuid,
    pub dpwh_item_number_raw: String,
    pub description: String,
    pub unit: Unit,
    pub quantity: f64,
    pub trade: Trade,
    pub source_takeoff_line_ids: Vec<Uuid>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoqSummary {
    pub total_lines: usize,
    pub total_quantity: f64,
    /// BOQ lines per trade
    pub trades: BTreeMap<Trade, usize>,
}

/// Output of [`generate_boq`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoqResult {
    pub boq_lines: Vec<BoqLine>,
    pub summary: BoqSummary,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Outcome of pay item resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayItemResolution {
    /// `None` when neither an explicit item nor a default exists
    pub item: Option<String>,
    pub warning: Option<String>,
}

/// Pick the explicit item, else the default (with a warning), else nothing.
pub fn resolve_pay_item(
    trade: Trade,
    explicit: Option<&str>,
    default: Option<&str>,
    subject: &str,
) -> PayItemResolution {
    match (explicit, default) {
        (Some(item), _) => PayItemResolution {
            item: Some(item.to_string()),
            warning: None,
        },
        (None, Some(default)) => PayItemResolution {
            item: Some(default.to_string()),
            warning: Some(format!(
                "{}: no pay item assigned for {}; using default {}",
                trade, subject, default
            )),
        },
        (None, None) => PayItemResolution {
            item: None,
            warning: Some(format!(
                "{}: no pay item assigned for {} and no default configured; lines skipped",
                trade, subject
            )),
        },
    }
}

/// Messages kept in first-seen order, each reported once
#[derive(Debug, Default)]
struct Messages {
    seen: HashSet<String>,
    list: Vec<String>,
}

impl Messages {
    fn push(&mut self, message: String) {
        if self.seen.insert(message.clone()) {
            tracing::warn!("boq: {}", message);
            self.list.push(message);
        }
    }
}

fn line_subject(line: &TakeoffLine) -> String {
    match &line.classification.template {
        Some(name) => format!("{} '{}'", line.classification.element_type.code(), name),
        None => format!("{} {}", line.classification.element_type.code(), line.source_element_id),
    }
}

/// Resolve the pay item a takeoff line is billed under.
fn resolve_line(line: &TakeoffLine, defaults: &DefaultPayItems) -> PayItemResolution {
    let explicit = line.classification.pay_item.as_deref();
    match line.trade {
        Trade::Concrete => resolve_pay_item(line.trade, explicit, defaults.concrete.as_deref(), &line_subject(line)),
        Trade::Rebar => resolve_pay_item(line.trade, explicit, defaults.rebar.as_deref(), &line_subject(line)),
        // Formwork is always billed under the one configured item
        Trade::Formwork => resolve_pay_item(line.trade, defaults.formwork.as_deref(), None, "formwork"),
        Trade::Finishes | Trade::Roofing | Trade::ScheduleItems => {
            resolve_pay_item(line.trade, explicit, None, &line_subject(line))
        }
    }
}

/// Lines sharing a trade and pay item
#[derive(Debug)]
struct Group<'a> {
    trade: Trade,
    item: String,
    lines: Vec<&'a TakeoffLine>,
}

fn group_lines<'a>(lines: &'a [TakeoffLine], defaults: &DefaultPayItems, warnings: &mut Messages) -> Vec<Group<'a>> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<(Trade, String), usize> = HashMap::new();

    for line in lines {
        let resolution = resolve_line(line, defaults);
        if let Some(warning) = resolution.warning {
            warnings.push(warning);
        }
        let Some(item) = resolution.item else {
            continue;
        };
        let key = (line.trade, item);
        match index.get(&key) {
            Some(&i) => groups[i].lines.push(line),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    trade: key.0,
                    item: key.1,
                    lines: vec![line],
                });
            }
        }
    }
    groups
}

/// Result of building one group
enum GroupOutcome {
    Line(BoqLine, Vec<String>),
    Skipped(String),
    Failed(String),
}

fn group_tags(group: &Group) -> Vec<String> {
    let mut tags = Vec::new();
    let mut seen = HashSet::new();
    let mut histogram: BTreeMap<ElementType, HashSet<&str>> = BTreeMap::new();
    for line in &group.lines {
        for tag in line.classification.descriptive_tags() {
            if seen.insert(tag.clone()) {
                tags.push(tag);
            }
        }
        histogram
            .entry(line.classification.element_type)
            .or_default()
            .insert(line.source_element_id.as_str());
    }
    for (element_type, sources) in histogram {
        tags.push(format!("element_count:{}:{}", element_type.code(), sources.len()));
    }
    tags.push(format!("dpwh:{}", group.item));
    tags.push(format!("trade:{}", group.trade));
    tags
}

fn build_group(group: &Group, catalog: &dyn PayItemCatalog) -> GroupOutcome {
    let Some(item) = catalog.find_by_item_number(&group.item) else {
        let message = format!(
            "{}: {} ({} takeoff lines excluded)",
            group.trade,
            CalcError::catalog_item_not_found(&group.item),
            group.lines.len()
        );
        // A missing formwork default skips formwork without failing the BOQ
        return if group.trade == Trade::Formwork {
            GroupOutcome::Skipped(message)
        } else {
            GroupOutcome::Failed(message)
        };
    };

    let mut warnings = Vec::new();
    if item.trade != group.trade {
        warnings.push(format!(
            "{}: item {} is catalogued under {}",
            group.trade, item.item_number, item.trade
        ));
    }
    let line_unit = group.lines[0].unit;
    if group.lines.iter().any(|l| l.unit != line_unit) {
        warnings.push(format!("{}: item {} mixes takeoff units", group.trade, item.item_number));
    } else if line_unit != item.unit {
        warnings.push(format!(
            "{}: item {} is measured in {} but takeoff lines are in {}",
            group.trade, item.item_number, item.unit, line_unit
        ));
    }

    let raw: f64 = group.lines.iter().map(|l| l.quantity).sum();
    let line = BoqLine {
        id: Uuid::new_v4(),
        dpwh_item_number_raw: group.item.clone(),
        description: item.description.clone(),
        unit: item.unit,
        quantity: round_to(raw, line_unit.boq_decimals()),
        trade: group.trade,
        source_takeoff_line_ids: group.lines.iter().map(|l| l.id).collect(),
        tags: group_tags(group),
    };
    GroupOutcome::Line(line, warnings)
}

/// Map takeoff lines to BOQ lines.
pub fn generate_boq(takeoff_lines: &[TakeoffLine], project: &Project, catalog: &dyn PayItemCatalog) -> BoqResult {
    let mut warnings = Messages::default();
    let groups = group_lines(takeoff_lines, &project.settings.default_pay_items, &mut warnings);

    let outcomes: Vec<GroupOutcome> = groups.par_iter().map(|group| build_group(group, catalog)).collect();

    let mut boq_lines = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            GroupOutcome::Line(line, line_warnings) => {
                for warning in line_warnings {
                    warnings.push(warning);
                }
                boq_lines.push(line);
            }
            GroupOutcome::Skipped(message) => warnings.push(message),
            GroupOutcome::Failed(message) => {
                tracing::warn!("boq: {}", message);
                errors.push(message);
            }
        }
    }

    let mut trades = BTreeMap::new();
    for line in &boq_lines {
        *trades.entry(line.trade).or_insert(0) += 1;
    }
    let summary = BoqSummary {
        total_lines: boq_lines.len(),
        total_quantity: round_to(boq_lines.iter().map(|l| l.quantity).sum(), 3),
        trades,
    };
    tracing::debug!(
        "boq: {} takeoff lines -> {} BOQ lines, {} warnings, {} errors",
        takeoff_lines.len(),
        summary.total_lines,
        warnings.list.len(),
        errors.len()
    );

    BoqResult {
        boq_lines,
        summary,
        warnings: warnings.list,
        errors,
    }
}

/// Map a raw JSON payload of takeoff lines. Anything but an array is rejected
/// before any grouping starts.
pub fn generate_boq_json(
    payload: &serde_json::Value,
    project: &Project,
    catalog: &dyn PayItemCatalog,
) -> CalcResult<BoqResult> {
    if !payload.is_array() {
        return Err(CalcError::malformed_request("takeoff lines must be a JSON array"));
    }
    let lines: Vec<TakeoffLine> = serde_json::from_value(payload.clone())
        .map_err(|e| CalcError::malformed_request(format!("invalid takeoff line: {}", e)))?;
    Ok(generate_boq(&lines, project, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::takeoff::Classification;
    use chrono::Utc;

    fn line(source: &str, trade: Trade, quantity: f64, unit: Unit, pay_item: Option<&str>) -> TakeoffLine {
        let classification = Classification {
            template: Some("B-300x500".to_string()),
            level: Some("L2".to_string()),
            pay_item: pay_item.map(str::to_string),
            ..Classification::new(ElementType::Beam)
        };
        TakeoffLine {
            id: Uuid::new_v4(),
            source_element_id: source.to_string(),
            trade,
            resource_key: "test".to_string(),
            quantity,
            unit,
            formula_text: String::new(),
            inputs_snapshot: BTreeMap::new(),
            assumptions: Vec::new(),
            tags: classification.display_tags(),
            classification,
            calculated_at: Utc::now(),
        }
    }

    #[test]
    fn test_resolve_pay_item() {
        let explicit = resolve_pay_item(Trade::Concrete, Some("900 (1) c"), Some("900 (1) a"), "beam");
        assert_eq!(explicit.item.as_deref(), Some("900 (1) c"));
        assert!(explicit.warning.is_none());

        let fallback = resolve_pay_item(Trade::Concrete, None, Some("900 (1) a"), "beam");
        assert_eq!(fallback.item.as_deref(), Some("900 (1) a"));
        assert!(fallback.warning.unwrap().contains("default 900 (1) a"));

        let none = resolve_pay_item(Trade::Roofing, None, None, "roof");
        assert!(none.item.is_none());
        assert!(none.warning.is_some());
    }

    #[test]
    fn test_default_warning_reported_once() {
        let lines = vec![
            line("B1", Trade::Concrete, 0.63, Unit::CubicMeter, None),
            line("B2", Trade::Concrete, 0.63, Unit::CubicMeter, None),
        ];
        let result = generate_boq(&lines, &Project::default(), InMemoryCatalog::standard());
        assert_eq!(result.boq_lines.len(), 1);
        assert_eq!(result.boq_lines[0].quantity, 1.26);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.boq_lines[0].tags.contains(&"element_count:beam:2".to_string()));
        assert!(!result.boq_lines[0].tags.iter().any(|t| t.starts_with("type:")));
    }

    #[test]
    fn test_unknown_item_excluded_as_error() {
        let lines = vec![
            line("B1", Trade::Concrete, 1.0, Unit::CubicMeter, Some("999 (9)")),
            line("B1", Trade::Formwork, 5.2, Unit::SquareMeter, None),
        ];
        let result = generate_boq(&lines, &Project::default(), InMemoryCatalog::standard());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("999 (9)"));
        assert_eq!(result.boq_lines.len(), 1);
        assert_eq!(result.boq_lines[0].trade, Trade::Formwork);
    }

    #[test]
    fn test_formwork_without_default_is_warning_only() {
        let mut project = Project::default();
        project.settings.default_pay_items.formwork = None;
        let lines = vec![line("B1", Trade::Formwork, 5.2, Unit::SquareMeter, None)];
        let result = generate_boq(&lines, &project, InMemoryCatalog::standard());
        assert!(result.boq_lines.is_empty());
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_finish_without_item_dropped() {
        let lines = vec![
            line("S1", Trade::Finishes, 20.0, Unit::SquareMeter, None),
            line("S2", Trade::Finishes, 12.5, Unit::SquareMeter, Some("1018 (1)")),
        ];
        let result = generate_boq(&lines, &Project::default(), InMemoryCatalog::standard());
        assert_eq!(result.boq_lines.len(), 1);
        assert_eq!(result.boq_lines[0].quantity, 12.5);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.summary.trades.get(&Trade::Finishes), Some(&1));
    }

    #[test]
    fn test_trade_mismatch_warns() {
        let lines = vec![line("B1", Trade::Concrete, 1.0, Unit::CubicMeter, Some("903 (2)"))];
        let result = generate_boq(&lines, &Project::default(), InMemoryCatalog::standard());
        assert_eq!(result.boq_lines.len(), 1);
        assert!(result.warnings.iter().any(|w| w.contains("catalogued under Formwork")));
    }

    #[test]
    fn test_json_must_be_array() {
        let payload = serde_json::json!({ "takeoff_lines": [] });
        let err = generate_boq_json(&payload, &Project::default(), InMemoryCatalog::standard()).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_REQUEST");

        let empty = generate_boq_json(&serde_json::json!([]), &Project::default(), InMemoryCatalog::standard());
        assert_eq!(empty.unwrap().summary.total_lines, 0);
    }
}
