//! # File Persistence
//!
//! Project snapshots and calc-run records are stored as pretty JSON.
//!
//! - **Atomic writes**: JSON goes to a `.tmp` sibling, is synced, then renamed
//!   over the target
//! - **Advisory locks**: a `.lock` sibling holds an OS lock (`fs2`) plus a
//!   JSON note of who holds it
//! - **Schema check**: project files carry a version that must be compatible
//!
//! Calc runs live in a directory, one `<run_id>.json` file per run. A run is
//! written once after the takeoff and rewritten once when its BOQ is attached.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use takeoff_core::calc_run::CalcRun;
//! use takeoff_core::file_io::{load_project, save_calc_run};
//! use takeoff_core::takeoff::generate_takeoff;
//!
//! let project = load_project(Path::new("tower.json"))?;
//! let run = CalcRun::from_takeoff(&project, generate_takeoff(&project));
//! let saved = save_calc_run(&run, Path::new("runs"), "estimator@example.com")?;
//! println!("run written to {}", saved.display());
//! # Ok::<(), takeoff_core::errors::CalcError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::boq::BoqResult;
use crate::calc_run::CalcRun;
use crate::catalog::InMemoryCatalog;
use crate::errors::{CalcError, CalcResult};
use crate::project::{Project, SCHEMA_VERSION};

/// Contents of a `.lock` file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME").ok().or_else(|| std::env::var("HOST").ok())
    }
}

/// Exclusive lock on a file, released on drop.
pub struct FileLock {
    lock_path: PathBuf,
    /// Holds the OS lock
    _handle: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire the lock for `path`, or fail with `FileLocked` if a live holder exists.
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> CalcResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if let Some(holder) = live_holder(&lock_path) {
            return Err(CalcError::file_locked(
                path.display().to_string(),
                format!("{} ({})", holder.user_id, holder.machine),
                holder.locked_at.to_rfc3339(),
            ));
        }

        let mut handle = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| io_error("create lock", &lock_path, e))?;

        handle
            .try_lock_exclusive()
            .map_err(|_| CalcError::file_locked(path.display().to_string(), "another process", "unknown"))?;

        let note = to_json(&info)?;
        handle
            .write_all(note.as_bytes())
            .and_then(|_| handle.sync_all())
            .map_err(|e| io_error("write lock", &lock_path, e))?;

        tracing::debug!("locked {}", path.display());
        Ok(FileLock {
            lock_path,
            _handle: handle,
            info,
        })
    }

    /// Current holder of the lock on `path`, if any.
    pub fn check(path: &Path) -> Option<LockInfo> {
        live_holder(&lock_path_for(path))
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock_path = path.to_path_buf();
    let extension = lock_path
        .extension()
        .map(|e| format!("{}.lock", e.to_string_lossy()))
        .unwrap_or_else(|| "lock".to_string());
    lock_path.set_extension(extension);
    lock_path
}

fn live_holder(lock_path: &Path) -> Option<LockInfo> {
    if !lock_path.exists() {
        return None;
    }
    let info: LockInfo = read_json(lock_path).ok()?;
    if is_stale(&info) {
        None
    } else {
        Some(info)
    }
}

/// A lock is stale when its process is gone from this machine, or it is over a day old.
fn is_stale(info: &LockInfo) -> bool {
    if hostname().as_deref() == Some(info.machine.as_str()) {
        #[cfg(unix)]
        {
            if fs::metadata(format!("/proc/{}", info.pid)).is_err() {
                return true;
            }
        }
    }
    (Utc::now() - info.locked_at).num_hours() > 24
}

fn io_error(operation: &str, path: &Path, e: std::io::Error) -> CalcError {
    CalcError::file_error(operation, path.display().to_string(), e.to_string())
}

fn to_json<T: Serialize>(value: &T) -> CalcResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| CalcError::SerializationError { reason: e.to_string() })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CalcResult<T> {
    let mut contents = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut contents))
        .map_err(|e| io_error("read", path, e))?;
    serde_json::from_str(&contents).map_err(|e| CalcError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })
}

/// Write `contents` to `path` through a synced temp file and a rename.
fn write_atomic(path: &Path, contents: &str) -> CalcResult<()> {
    let tmp_path = path.with_extension("json.tmp");
    let mut tmp = File::create(&tmp_path).map_err(|e| io_error("create temp file", &tmp_path, e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.sync_all())
        .map_err(|e| io_error("write temp file", &tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_error("rename to final", path, e)
    })
}

// ============================================================================
// Projects
// ============================================================================

/// Save a project atomically, stamping its modified time.
pub fn save_project(project: &mut Project, path: &Path) -> CalcResult<()> {
    project.touch();
    write_atomic(path, &to_json(project)?)
}

/// Load a project and check its schema version.
pub fn load_project(path: &Path) -> CalcResult<Project> {
    let project: Project = read_json(path)?;
    validate_version(&project.meta.version)?;
    tracing::debug!(
        "loaded project {} ({} instances) from {}",
        project.meta.job_id,
        project.instances.len(),
        path.display()
    );
    Ok(project)
}

/// A file's schema version is accepted when the major matches and, while on
/// 0.x, its minor is not newer than ours.
fn validate_version(file_version: &str) -> CalcResult<()> {
    let parse = |v: &str| -> Vec<u32> { v.split('.').filter_map(|p| p.parse().ok()).collect() };
    let file = parse(file_version);
    let current = parse(SCHEMA_VERSION);
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    if file.is_empty() || current.is_empty() || file[0] != current[0] {
        return Err(mismatch());
    }
    if current[0] == 0 && file.len() > 1 && current.len() > 1 && file[1] > current[1] {
        return Err(mismatch());
    }
    Ok(())
}

/// Load a pay-item catalog from a JSON array of items.
pub fn load_catalog(path: &Path) -> CalcResult<InMemoryCatalog> {
    let mut contents = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut contents))
        .map_err(|e| io_error("read", path, e))?;
    InMemoryCatalog::from_json(&contents)
}

// ============================================================================
// Calc runs
// ============================================================================

pub fn calc_run_path(dir: &Path, run: &CalcRun) -> PathBuf {
    dir.join(format!("{}.json", run.run_id))
}

/// Write a new calc run into `dir`. Returns the file written.
pub fn save_calc_run(run: &CalcRun, dir: &Path, user_id: &str) -> CalcResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| io_error("create directory", dir, e))?;
    let path = calc_run_path(dir, run);
    if path.exists() {
        return Err(CalcError::file_error(
            "save calc run",
            path.display().to_string(),
            "run already recorded",
        ));
    }
    let _lock = FileLock::acquire(&path, user_id)?;
    write_atomic(&path, &to_json(run)?)?;
    tracing::debug!("saved calc run {} to {}", run.run_id, path.display());
    Ok(path)
}

pub fn load_calc_run(path: &Path) -> CalcResult<CalcRun> {
    read_json(path)
}

/// Attach a BOQ to a stored run and rewrite it. Fails if it already has one.
pub fn update_calc_run_with_boq(path: &Path, boq: BoqResult, user_id: &str) -> CalcResult<CalcRun> {
    let _lock = FileLock::acquire(path, user_id)?;
    let mut run = load_calc_run(path)?;
    run.attach_boq(boq)?;
    write_atomic(path, &to_json(&run)?)?;
    tracing::debug!("attached BOQ to calc run {}", run.run_id);
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::takeoff::generate_takeoff;
    use std::env::temp_dir;

    fn temp_path(name: &str) -> PathBuf {
        temp_dir().join(format!("takeoff_test_{}.json", name))
    }

    #[test]
    fn test_lock_path_generation() {
        let lock_path = lock_path_for(Path::new("/jobs/tower.json"));
        assert_eq!(lock_path, Path::new("/jobs/tower.json.lock"));
    }

    #[test]
    fn test_project_roundtrip() {
        let path = temp_path("project_roundtrip");
        let mut project = Project::new("Test Estimator", "TEST-001", "Test Client");
        let created = project.meta.modified;
        save_project(&mut project, &path).unwrap();
        assert!(project.meta.modified >= created);

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded.meta.estimator, "Test Estimator");
        assert_eq!(loaded.meta.modified, project.meta.modified);
        assert_eq!(loaded.settings, project.settings);
        assert!(!path.with_extension("json.tmp").exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_lock_acquire_and_release() {
        let path = temp_path("lock");
        File::create(&path).unwrap();

        let lock = FileLock::acquire(&path, "test@example.com").unwrap();
        let lock_path = lock_path_for(&path);
        assert!(lock_path.exists());
        assert_eq!(FileLock::check(&path).map(|i| i.user_id), Some(lock.info.user_id.clone()));

        drop(lock);
        assert!(!lock_path.exists());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.7").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("garbage").is_err());
    }

    #[test]
    fn test_calc_run_written_once_and_updated_once() {
        let dir = temp_dir().join("takeoff_test_runs");
        let project = Project::default();
        let run = CalcRun::from_takeoff(&project, generate_takeoff(&project));

        let path = save_calc_run(&run, &dir, "tester").unwrap();
        assert!(save_calc_run(&run, &dir, "tester").is_err());

        let updated = update_calc_run_with_boq(&path, BoqResult::default(), "tester").unwrap();
        assert!(updated.has_boq());
        assert_eq!(load_calc_run(&path).unwrap().run_id, run.run_id);
        assert!(update_calc_run_with_boq(&path, BoqResult::default(), "tester").is_err());

        let _ = fs::remove_file(&path);
    }
}
