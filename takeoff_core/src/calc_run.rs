//! # Calculation Runs
//!
//! A [`CalcRun`] is the audit record of one takeoff: what was computed, when,
//! and the BOQ later mapped from it. It is created once per takeoff and takes
//! at most one BOQ.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::calc_run::{CalcRun, RunStatus};
//! use takeoff_core::catalog::InMemoryCatalog;
//! use takeoff_core::project::Project;
//! use takeoff_core::{boq, takeoff};
//!
//! let project = Project::new("Estimator", "25-001", "Client");
//! let mut run = CalcRun::from_takeoff(&project, takeoff::generate_takeoff(&project));
//! assert_eq!(run.status, RunStatus::TakeoffComplete);
//!
//! let result = boq::generate_boq(&run.takeoff.takeoff_lines, &project, InMemoryCatalog::standard());
//! run.attach_boq(result).unwrap();
//! assert!(run.attach_boq(Default::default()).is_err());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::boq::{BoqResult, BoqSummary};
use crate::errors::{CalcError, CalcResult};
use crate::project::Project;
use crate::takeoff::{TakeoffResult, TakeoffSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Takeoff computed, no BOQ yet
    TakeoffComplete,
    /// Takeoff and BOQ computed
    BoqComplete,
    /// Computed, but some units of work were skipped
    CompletedWithErrors,
}

/// Combined summary of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub takeoff: TakeoffSummary,
    #[serde(default)]
    pub boq: Option<BoqSummary>,
    pub error_count: usize,
    pub warning_count: usize,
}

/// Audit record of one takeoff and its BOQ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcRun {
    pub run_id: Uuid,
    pub project_job_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: RunStatus,
    pub takeoff: TakeoffResult,
    #[serde(default)]
    pub boq: Option<BoqResult>,
    pub summary: RunSummary,
}

impl CalcRun {
    pub fn from_takeoff(project: &Project, takeoff: TakeoffResult) -> Self {
        let now = Utc::now();
        let status = if takeoff.errors.is_empty() {
            RunStatus::TakeoffComplete
        } else {
            RunStatus::CompletedWithErrors
        };
        let summary = RunSummary {
            takeoff: takeoff.summary.clone(),
            boq: None,
            error_count: takeoff.errors.len(),
            warning_count: takeoff.warnings.len(),
        };
        let run = CalcRun {
            run_id: Uuid::new_v4(),
            project_job_id: project.meta.job_id.clone(),
            created_at: now,
            updated_at: now,
            status,
            takeoff,
            boq: None,
            summary,
        };
        tracing::debug!("calc run {} created ({} takeoff lines)", run.run_id, run.summary.takeoff.takeoff_line_count);
        run
    }

    /// Attach the BOQ mapped from this run's takeoff. Allowed once.
    pub fn attach_boq(&mut self, boq: BoqResult) -> CalcResult<()> {
        if self.boq.is_some() {
            return Err(CalcError::invalid_input(
                "boq",
                self.run_id.to_string(),
                "run already has a BOQ attached",
            ));
        }
        self.summary.boq = Some(boq.summary.clone());
        self.summary.error_count += boq.errors.len();
        self.summary.warning_count += boq.warnings.len();
        self.status = if self.summary.error_count == 0 {
            RunStatus::BoqComplete
        } else {
            RunStatus::CompletedWithErrors
        };
        self.boq = Some(boq);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn has_boq(&self) -> bool {
        self.boq.is_some()
    }
}
