//! # takeoff_core - Quantity Takeoff and BOQ Engine
//!
//! `takeoff_core` turns a building model (grid, levels, element templates and
//! their placed instances, spaces, roofs, trusses, schedule items) into
//! quantity takeoff lines, then groups those lines into a Bill of Quantities
//! against a DPWH pay-item catalog. All inputs and outputs are
//! JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: every stage is a pure function of its inputs
//! - **Traceable**: each quantity carries its formula, inputs, and assumptions;
//!   each BOQ line lists the takeoff lines it came from
//! - **Partial results**: a failing element or group is reported, never fatal
//!
//! ## Quick Start
//!
//! ```rust
//! use takeoff_core::catalog::InMemoryCatalog;
//! use takeoff_core::project::Project;
//! use takeoff_core::{generate_boq, generate_takeoff};
//!
//! let project = Project::new("Jane Estimator", "25-001", "Acme Construction");
//! let takeoff = generate_takeoff(&project);
//! let boq = generate_boq(&takeoff.takeoff_lines, &project, InMemoryCatalog::standard());
//! assert!(boq.errors.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`geometry`] - Grid and level resolution
//! - [`calculations`] - Element, truss, finish, roof, and schedule calculators
//! - [`takeoff`] - Takeoff line aggregation
//! - [`boq`] - Pay-item grouping
//! - [`catalog`] - Pay-item lookup contract
//! - [`calc_run`] - Audit record of a takeoff and its BOQ
//! - [`project`] - Project snapshot and settings
//! - [`materials`] - Reinforcing bar data
//! - [`units`] - Unit wrappers and rounding
//! - [`errors`] - Structured error types
//! - [`file_io`] - Atomic saves and file locking

pub mod boq;
pub mod calc_run;
pub mod calculations;
pub mod catalog;
pub mod errors;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_io;
pub mod geometry;
pub mod materials;
pub mod project;
pub mod takeoff;
pub mod units;

pub use boq::{generate_boq, BoqLine, BoqResult};
pub use calc_run::CalcRun;
pub use catalog::{CatalogItem, InMemoryCatalog, PayItemCatalog};
pub use errors::{CalcError, CalcResult};
#[cfg(not(target_arch = "wasm32"))]
pub use file_io::{load_project, save_project, FileLock};
pub use project::{GlobalSettings, Project, ProjectMetadata};
pub use takeoff::{generate_takeoff, TakeoffLine, TakeoffResult, Trade};
