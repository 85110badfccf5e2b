//! # Takeoff CLI
//!
//! Runs the takeoff and BOQ pipeline on a project snapshot from the terminal.
//!
//! ```text
//! takeoff_cli takeoff tower.json --runs runs/
//! takeoff_cli boq runs/<run_id>.json tower.json --catalog dpwh.json
//! takeoff_cli truss --type howe --span 9000 --rise 1800 --spacing 1000
//! ```
//!
//! Exit codes: 0 success, 1 some elements skipped, 2 error, 3 file in use.
//! `RUST_LOG` overrides the log filter set by `--verbose`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use takeoff_core::boq::{generate_boq, BoqResult};
use takeoff_core::calc_run::CalcRun;
use takeoff_core::calculations::truss::{
    building_totals, synthesize, trusses_per_building, MemberMaterial, TrussParameters, TrussType,
};
use takeoff_core::catalog::InMemoryCatalog;
use takeoff_core::errors::{CalcError, CalcResult};
use takeoff_core::file_io::{load_calc_run, load_catalog, load_project, save_calc_run, update_calc_run_with_boq};
use takeoff_core::takeoff::{generate_takeoff, TakeoffResult};

#[derive(Parser)]
#[command(name = "takeoff_cli")]
#[command(about = "Quantity takeoff and BOQ mapping for building projects")]
#[command(version)]
struct Cli {
    #[arg(long, short, global = true, help = "Log pipeline diagnostics to stderr")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Compute takeoff lines for a project and record a calc run")]
    Takeoff {
        #[arg(help = "Path to the project JSON")]
        project: PathBuf,
        #[arg(long, value_name = "DIR", help = "Directory to record the calc run in")]
        runs: Option<PathBuf>,
        #[arg(long, help = "Also map the BOQ in the same run")]
        boq: bool,
        #[arg(long, value_name = "PATH", help = "Catalog JSON (defaults to the built-in catalog)")]
        catalog: Option<PathBuf>,
        #[arg(long, short, value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
    },
    #[command(about = "Map the BOQ for a recorded calc run")]
    Boq {
        #[arg(help = "Path to the calc run JSON")]
        run: PathBuf,
        #[arg(help = "Path to the project JSON the run was computed from")]
        project: PathBuf,
        #[arg(long, value_name = "PATH", help = "Catalog JSON (defaults to the built-in catalog)")]
        catalog: Option<PathBuf>,
        #[arg(long, short, value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
    },
    #[command(about = "Synthesize a single roof truss")]
    Truss {
        #[arg(long = "type", value_enum, help = "Truss configuration")]
        truss_type: TrussArg,
        #[arg(long, help = "Span (mm)")]
        span: f64,
        #[arg(long, help = "Rise (mm)")]
        rise: f64,
        #[arg(long, default_value_t = 0.0, help = "Eave overhang (mm)")]
        overhang: f64,
        #[arg(long, default_value_t = 1000.0, help = "Truss spacing (mm)")]
        spacing: f64,
        #[arg(long, help = "Howe side vertical count")]
        verticals: Option<u32>,
        #[arg(long, value_name = "MM", help = "Building length for per-building totals (mm)")]
        building_length: Option<f64>,
        #[arg(long, default_value = "C75x40x0.75", help = "Section for all members")]
        section: String,
        #[arg(long, default_value_t = 1.2, help = "Section weight (kg/m)")]
        weight: f64,
        #[arg(long, default_value_t = 1.0, help = "Connector plate thickness (mm)")]
        plate: f64,
        #[arg(long, short, value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum TrussArg {
    Howe,
    Fink,
    Kingpost,
}

impl From<TrussArg> for TrussType {
    fn from(arg: TrussArg) -> Self {
        match arg {
            TrussArg::Howe => TrussType::Howe,
            TrussArg::Fink => TrussType::Fink,
            TrussArg::Kingpost => TrussType::Kingpost,
        }
    }
}

/// Filter used when `RUST_LOG` is unset
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "takeoff_core=debug,takeoff_cli=debug"
    } else {
        "error"
    }
}

/// Log to stderr. `RUST_LOG` wins; otherwise `--verbose` selects debug.
fn init_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose).into()))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Takeoff {
            project,
            runs,
            boq,
            catalog,
            format,
        } => run_takeoff(&project, runs.as_deref(), boq, catalog.as_deref(), format),
        Commands::Boq {
            run,
            project,
            catalog,
            format,
        } => run_boq(&run, &project, catalog.as_deref(), format),
        Commands::Truss {
            truss_type,
            span,
            rise,
            overhang,
            spacing,
            verticals,
            building_length,
            section,
            weight,
            plate,
            format,
        } => {
            let material = MemberMaterial::new(section, weight);
            let params = TrussParameters {
                truss_type: truss_type.into(),
                span_mm: span,
                rise_mm: rise,
                overhang_mm: overhang,
                spacing_mm: spacing,
                vertical_webs: verticals,
                plate_thickness_mm: plate,
                top_chord: material.clone(),
                bottom_chord: material.clone(),
                web: material,
            };
            run_truss(&params, building_length, format)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!("{}", json);
            }
            if e.is_recoverable() {
                eprintln!("The file is in use; try again once it is released.");
                ExitCode::from(3)
            } else {
                ExitCode::from(2)
            }
        }
    }
}

fn with_catalog<T>(path: Option<&Path>, f: impl FnOnce(&InMemoryCatalog) -> T) -> CalcResult<T> {
    match path {
        Some(path) => Ok(f(&load_catalog(path)?)),
        None => Ok(f(InMemoryCatalog::standard())),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CalcError::SerializationError { reason: e.to_string() })?;
    println!("{}", json);
    Ok(())
}

/// Exit code 1 when any unit of work was skipped
fn outcome_code(errors: usize) -> ExitCode {
    if errors == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn run_takeoff(
    project_path: &Path,
    runs_dir: Option<&Path>,
    with_boq: bool,
    catalog_path: Option<&Path>,
    format: OutputFormat,
) -> CalcResult<ExitCode> {
    let project = load_project(project_path)?;
    let takeoff = generate_takeoff(&project);
    let mut run = CalcRun::from_takeoff(&project, takeoff);

    if with_boq {
        let boq = with_catalog(catalog_path, |catalog| {
            generate_boq(&run.takeoff.takeoff_lines, &project, catalog)
        })?;
        run.attach_boq(boq)?;
    }

    let saved = match runs_dir {
        Some(dir) => Some(save_calc_run(&run, dir, &project.meta.estimator)?),
        None => None,
    };

    match format {
        OutputFormat::Json => print_json(&run)?,
        OutputFormat::Text => {
            print_takeoff(&run.takeoff);
            if let Some(boq) = &run.boq {
                print_boq(boq);
            }
            println!();
            println!("Run:  {}", run.run_id);
            if let Some(path) = saved {
                println!("File: {}", path.display());
            }
        }
    }
    Ok(outcome_code(run.summary.error_count))
}

fn run_boq(
    run_path: &Path,
    project_path: &Path,
    catalog_path: Option<&Path>,
    format: OutputFormat,
) -> CalcResult<ExitCode> {
    let project = load_project(project_path)?;
    let run = load_calc_run(run_path)?;
    let boq = with_catalog(catalog_path, |catalog| {
        generate_boq(&run.takeoff.takeoff_lines, &project, catalog)
    })?;
    let run = update_calc_run_with_boq(run_path, boq, &project.meta.estimator)?;

    if let Some(boq) = &run.boq {
        match format {
            OutputFormat::Json => print_json(boq)?,
            OutputFormat::Text => print_boq(boq),
        }
    }
    Ok(outcome_code(run.summary.error_count))
}

fn run_truss(params: &TrussParameters, building_length: Option<f64>, format: OutputFormat) -> CalcResult<ExitCode> {
    let result = synthesize(params)?;
    let totals = building_length.map(|length| building_totals(&result, trusses_per_building(length, params.spacing_mm)));

    if format == OutputFormat::Json {
        print_json(&serde_json::json!({ "truss": result, "building": totals }))?;
        return Ok(ExitCode::SUCCESS);
    }

    println!("═══════════════════════════════════════");
    println!(
        "  {} TRUSS  span {:.0} mm, rise {:.0} mm",
        params.truss_type.display_name().to_uppercase(),
        params.span_mm,
        params.rise_mm
    );
    println!("═══════════════════════════════════════");
    println!("Pitch: {:.2}°", result.geometry.pitch_deg);
    println!();
    println!("Members:");
    for m in &result.members {
        println!(
            "  {:<26} {:>2} × {:>7.3} m  {:>8.2} kg",
            m.name, m.quantity, m.length_m, m.weight_kg
        );
    }
    println!();
    println!("Plates:");
    for p in &result.plates {
        println!(
            "  {:<26} {:>2} × {:.0}×{:.0}×{} mm  {:>6.2} kg",
            format!("{:?}", p.joint),
            p.quantity,
            p.width_mm,
            p.height_mm,
            p.thickness_mm,
            p.weight_kg
        );
    }
    println!();
    println!("Weight per truss: {:.2} kg", result.weights.total_kg);
    if let Some(totals) = totals {
        println!(
            "Building: {} trusses, {:.2} kg, {:.4} cu.m steel",
            totals.truss_count, totals.total_weight_kg, totals.total_steel_volume_m3
        );
    }
    for warning in &result.warnings {
        println!("Warning: {}", warning);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_takeoff(takeoff: &TakeoffResult) {
    let s = &takeoff.summary;
    println!("═══════════════════════════════════════");
    println!("  TAKEOFF  {} lines from {} sources", s.takeoff_line_count, s.element_count);
    println!("═══════════════════════════════════════");
    println!("  Concrete:  {:>12.3} cu.m", s.total_concrete);
    println!("  Rebar:     {:>12.2} kg", s.total_rebar);
    println!("  Formwork:  {:>12.2} sq.m", s.total_formwork);
    println!("  Floor:     {:>12.2} sq.m", s.total_floor_area);
    println!("  Wall:      {:>12.2} sq.m", s.total_wall_area);
    println!("  Ceiling:   {:>12.2} sq.m", s.total_ceiling_area);
    println!("  Roof:      {:>12.2} sq.m", s.total_roof_area);
    for warning in &takeoff.warnings {
        println!("Warning: {}", warning);
    }
    for error in &takeoff.errors {
        println!("Error:   {}", error);
    }
}

fn print_boq(boq: &BoqResult) {
    println!();
    println!("═══════════════════════════════════════");
    println!("  BILL OF QUANTITIES  {} items", boq.summary.total_lines);
    println!("═══════════════════════════════════════");
    for line in &boq.boq_lines {
        println!(
            "  {:<12} {:<40} {:>12} {}",
            line.dpwh_item_number_raw,
            line.description,
            format!("{:.3}", line.quantity),
            line.unit
        );
    }
    for warning in &boq.warnings {
        println!("Warning: {}", warning);
    }
    for error in &boq.errors {
        println!("Error:   {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag_selects_debug_filter() {
        let cli = Cli::try_parse_from(["takeoff_cli", "--verbose", "truss", "--type", "fink", "--span", "9000", "--rise", "1800"])
            .unwrap();
        assert!(cli.verbose);
        assert!(EnvFilter::try_new(default_filter(cli.verbose)).is_ok());
        assert!(default_filter(true).contains("takeoff_core=debug"));
        assert_eq!(default_filter(false), "error");
    }
}
