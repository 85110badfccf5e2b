//! End-to-end takeoff and BOQ runs over small projects.

use std::collections::{BTreeSet, HashMap};

use approx::assert_abs_diff_eq;

use takeoff_core::boq::{generate_boq, generate_boq_json};
use takeoff_core::calc_run::{CalcRun, RunStatus};
use takeoff_core::calculations::roofing::{RoofPlane, RoofSlope, RoofType};
use takeoff_core::calculations::schedule::ScheduleItem;
use takeoff_core::calculations::truss::{
    synthesize, MemberGroup, MemberMaterial, MemberSubtype, TrussDesign, TrussParameters, TrussType,
};
use takeoff_core::calculations::{
    BarGroup, ColumnShape, ElementInstance, ElementTemplate, FoundationShape, Reinforcement, TemplateKind, TieSpec,
};
use takeoff_core::catalog::InMemoryCatalog;
use takeoff_core::geometry::{GridArea, GridAxis, GridLine, Level, Placement};
use takeoff_core::project::Project;
use takeoff_core::takeoff::{generate_takeoff, TakeoffLine, Trade};
use takeoff_core::units::{round_to, Unit};

fn base_project() -> Project {
    let mut project = Project::new("Estimator", "25-100", "Client");
    project.grid.x = vec![GridLine::new("A", 0.0), GridLine::new("B", 4.0), GridLine::new("C", 10.0)];
    project.grid.y = vec![GridLine::new("1", 0.0), GridLine::new("2", 4.0), GridLine::new("3", 8.0)];
    project.levels = vec![Level::new("GF", 0.0), Level::new("L2", 3.0), Level::new("RF", 6.0)];
    project.templates = vec![
        ElementTemplate {
            id: "TB".to_string(),
            name: "B-300x500".to_string(),
            kind: TemplateKind::Beam { width: 0.30, height: 0.50 },
            reinforcement: None,
            pay_item: None,
        },
        ElementTemplate {
            id: "TC".to_string(),
            name: "C-400".to_string(),
            kind: TemplateKind::Column {
                shape: ColumnShape::Rectangular { width: 0.4, height: 0.4 },
            },
            reinforcement: Some(Reinforcement {
                main: Some(BarGroup::count(20, 8)),
                ties: Some(TieSpec { diameter_mm: 10, spacing_m: 0.1 }),
                ..Default::default()
            }),
            pay_item: None,
        },
        ElementTemplate {
            id: "TS".to_string(),
            name: "S-150".to_string(),
            kind: TemplateKind::Slab { thickness: 0.15 },
            reinforcement: Some(Reinforcement {
                main: Some(BarGroup::spacing(12, 0.2)),
                secondary: Some(BarGroup::spacing(10, 0.25)),
                ..Default::default()
            }),
            pay_item: Some("900 (1) c".to_string()),
        },
        ElementTemplate {
            id: "TF".to_string(),
            name: "F-1500".to_string(),
            kind: TemplateKind::Foundation {
                shape: FoundationShape::Footing { length: 1.5, width: 1.5, depth: 0.4 },
            },
            reinforcement: Some(Reinforcement {
                main: Some(BarGroup::spacing(16, 0.15)),
                secondary: Some(BarGroup::spacing(16, 0.15)),
                ..Default::default()
            }),
            pay_item: None,
        },
    ];
    project
}

fn beam(id: &str, start: &str, end: &str) -> ElementInstance {
    ElementInstance {
        id: id.to_string(),
        template_id: "TB".to_string(),
        level: "L2".to_string(),
        placement: Placement::Span {
            axis: GridAxis::X,
            start: start.to_string(),
            end: end.to_string(),
        },
        end_level: None,
        tags: Vec::new(),
    }
}

fn instance(id: &str, template: &str, level: &str, placement: Placement) -> ElementInstance {
    ElementInstance {
        id: id.to_string(),
        template_id: template.to_string(),
        level: level.to_string(),
        placement,
        end_level: None,
        tags: Vec::new(),
    }
}

fn point(x: &str, y: &str) -> Placement {
    Placement::Point {
        x: x.to_string(),
        y: y.to_string(),
    }
}

fn kingpost() -> TrussParameters {
    TrussParameters {
        truss_type: TrussType::Kingpost,
        span_mm: 8000.0,
        rise_mm: 1600.0,
        overhang_mm: 0.0,
        spacing_mm: 1000.0,
        vertical_webs: None,
        plate_thickness_mm: 1.0,
        top_chord: MemberMaterial::new("C75x40x0.75", 1.2),
        bottom_chord: MemberMaterial::new("C75x40x0.75", 1.2),
        web: MemberMaterial::new("C75x40x0.75", 1.2),
    }
}

/// A project touching every trade
fn full_project() -> Project {
    let mut project = base_project();
    project.instances = vec![
        beam("B1", "A", "B"),
        beam("B2", "B", "C"),
        instance("C1", "TC", "GF", point("A", "1")),
        instance("C2", "TC", "L2", point("B", "1")),
        instance(
            "S1",
            "TS",
            "L2",
            Placement::Area {
                area: GridArea::new("A", "B", "1", "2"),
            },
        ),
        instance("F1", "TF", "GF", point("A", "1")),
    ];
    project.roof_types.push(RoofType {
        id: "RT1".to_string(),
        name: "Long span".to_string(),
        pay_item: Some("1014 (1) b".to_string()),
        waste: 0.05,
    });
    project.roof_planes.push(RoofPlane {
        id: "R1".to_string(),
        name: "Main roof".to_string(),
        level: "RF".to_string(),
        area: GridArea::new("A", "C", "1", "3"),
        eave_overhang_m: 0.6,
        slope: RoofSlope::Ratio { rise: 1.0, run: 3.0 },
        roof_type_id: "RT1".to_string(),
        computed: None,
    });
    project.trusses.push(TrussDesign {
        id: "TR1".to_string(),
        name: "Kingpost 8m".to_string(),
        level: Some("RF".to_string()),
        parameters: kingpost(),
        building_length_mm: 10000.0,
        pay_item: Some("1047 (3)".to_string()),
        tags: Vec::new(),
    });
    project.schedule_items.push(ScheduleItem {
        id: "SI1".to_string(),
        mark: "D1".to_string(),
        category: "doors".to_string(),
        description: "Flush door".to_string(),
        quantity: 4.0,
        unit: Unit::Set,
        pay_item: Some("1010 (2) a".to_string()),
        level: Some("GF".to_string()),
        tags: Vec::new(),
    });
    project
}

#[test]
fn beam_concrete_boundary_volume() {
    let mut project = base_project();
    project.instances.push(beam("B1", "A", "B"));
    let result = generate_takeoff(&project);

    let concrete = result
        .takeoff_lines
        .iter()
        .find(|l| l.trade == Trade::Concrete)
        .unwrap();
    assert_eq!(concrete.quantity, 0.630);
    assert_eq!(concrete.unit, Unit::CubicMeter);
    assert_eq!(concrete.inputs_snapshot["length"], 4.0);
}

#[test]
fn top_floor_column_is_skipped_with_one_error() {
    let mut project = base_project();
    project.instances.push(instance("C-TOP", "TC", "RF", point("A", "1")));
    project.instances.push(beam("B1", "A", "B"));
    let result = generate_takeoff(&project);

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("C-TOP"));
    assert!(result.takeoff_lines.iter().all(|l| l.source_element_id != "C-TOP"));
    assert_eq!(result.summary.element_count, 1);
}

#[test]
fn two_beams_one_boq_line_one_warning() {
    let mut project = base_project();
    project.instances.push(beam("B1", "A", "B"));
    project.instances.push(beam("B2", "A", "B"));
    let takeoff = generate_takeoff(&project);
    let boq = generate_boq(&takeoff.takeoff_lines, &project, InMemoryCatalog::standard());

    let concrete: Vec<_> = boq.boq_lines.iter().filter(|l| l.trade == Trade::Concrete).collect();
    assert_eq!(concrete.len(), 1);
    assert_eq!(concrete[0].dpwh_item_number_raw, "900 (1) a");
    assert_eq!(concrete[0].quantity, 1.26);
    assert_eq!(concrete[0].source_takeoff_line_ids.len(), 2);

    let default_warnings: Vec<_> = boq.warnings.iter().filter(|w| w.contains("900 (1) a")).collect();
    assert_eq!(default_warnings.len(), 1);
    assert!(boq.errors.is_empty());
}

#[test]
fn kingpost_truss_members() {
    let result = synthesize(&kingpost()).unwrap();
    assert_eq!(result.pieces_of(MemberSubtype::KingPost), 1);
    assert_eq!(result.pieces(MemberGroup::TopChord), 2);
    assert_abs_diff_eq!(result.geometry.pitch_rad, (1600.0f64 / 4000.0).atan(), epsilon = 1e-12);
}

#[test]
fn every_trade_is_mapped() {
    let project = full_project();
    let takeoff = generate_takeoff(&project);
    // C2 on L2 runs to RF; nothing sits on the top level
    assert!(takeoff.errors.is_empty(), "{:?}", takeoff.errors);

    let boq = generate_boq(&takeoff.takeoff_lines, &project, InMemoryCatalog::standard());
    assert!(boq.errors.is_empty(), "{:?}", boq.errors);

    let trades: BTreeSet<Trade> = boq.boq_lines.iter().map(|l| l.trade).collect();
    for trade in [Trade::Concrete, Trade::Rebar, Trade::Formwork, Trade::Roofing, Trade::ScheduleItems] {
        assert!(trades.contains(&trade), "{} missing", trade);
    }
    assert_eq!(boq.summary.total_lines, boq.boq_lines.len());
    assert_eq!(boq.summary.trades.values().sum::<usize>(), boq.boq_lines.len());

    let doors = boq
        .boq_lines
        .iter()
        .find(|l| l.dpwh_item_number_raw == "1010 (2) a")
        .unwrap();
    assert_eq!(doors.quantity, 4.0);
    assert!(doors.tags.contains(&"trade:Schedule Items".to_string()));
}

#[test]
fn boq_quantity_is_rounded_sum_of_sources() {
    let project = full_project();
    let takeoff = generate_takeoff(&project);
    let by_id: HashMap<_, &TakeoffLine> = takeoff.takeoff_lines.iter().map(|l| (l.id, l)).collect();

    let boq = generate_boq(&takeoff.takeoff_lines, &project, InMemoryCatalog::standard());
    for line in &boq.boq_lines {
        let sources: Vec<&TakeoffLine> = line.source_takeoff_line_ids.iter().map(|id| by_id[id]).collect();
        let decimals = sources[0].unit.boq_decimals();
        let sum: f64 = sources.iter().map(|l| l.quantity).sum();
        assert_abs_diff_eq!(line.quantity, round_to(sum, decimals), epsilon = 1e-9);
        assert!(sources.iter().all(|l| l.trade == line.trade));
    }
}

#[test]
fn boq_is_idempotent() {
    let project = full_project();
    let takeoff = generate_takeoff(&project);
    let catalog = InMemoryCatalog::standard();

    let key = |lines: &[takeoff_core::BoqLine]| -> BTreeSet<(String, String, String, Vec<String>)> {
        lines
            .iter()
            .map(|l| {
                let mut ids: Vec<String> = l.source_takeoff_line_ids.iter().map(|id| id.to_string()).collect();
                ids.sort();
                (l.trade.to_string(), l.dpwh_item_number_raw.clone(), format!("{:.3}", l.quantity), ids)
            })
            .collect()
    };

    let first = generate_boq(&takeoff.takeoff_lines, &project, catalog);
    let second = generate_boq(&takeoff.takeoff_lines, &project, catalog);
    assert_eq!(key(&first.boq_lines), key(&second.boq_lines));
    assert_eq!(first.warnings, second.warnings);
}

#[test]
fn json_payload_matches_typed_call() {
    let project = full_project();
    let takeoff = generate_takeoff(&project);
    let payload = serde_json::to_value(&takeoff.takeoff_lines).unwrap();

    let typed = generate_boq(&takeoff.takeoff_lines, &project, InMemoryCatalog::standard());
    let from_json = generate_boq_json(&payload, &project, InMemoryCatalog::standard()).unwrap();
    assert_eq!(typed.summary, from_json.summary);

    let bad = generate_boq_json(&serde_json::json!("lines"), &project, InMemoryCatalog::standard());
    assert_eq!(bad.unwrap_err().error_code(), "MALFORMED_REQUEST");
}

#[test]
fn calc_run_records_takeoff_then_boq() {
    let project = full_project();
    let mut run = CalcRun::from_takeoff(&project, generate_takeoff(&project));
    assert_eq!(run.status, RunStatus::TakeoffComplete);

    let boq = generate_boq(&run.takeoff.takeoff_lines, &project, InMemoryCatalog::standard());
    run.attach_boq(boq).unwrap();
    assert_eq!(run.status, RunStatus::BoqComplete);
    assert!(run.attach_boq(Default::default()).is_err());
}

#[test]
fn rounding_is_idempotent() {
    for x in [0.0, 0.6300000000000001, 1.005, -2.675, 123.456789, 1e-7, -0.0005] {
        for d in 0..6 {
            let once = round_to(x, d);
            assert_eq!(round_to(once, d), once, "x={} d={}", x, d);
        }
    }
}
