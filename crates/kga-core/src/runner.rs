//! Case runner: one independent verdict per manifest entry.
//!
//! Every entry runs regardless of what happened to its siblings; a setup
//! error (unreadable file) is recorded on that case alone. Manifest-level
//! errors are the caller's problem and abort the run before any case
//! starts. With the `threading` feature cases fan out on rayon; report
//! order still follows manifest name order either way.

use std::fmt;

#[cfg(feature = "threading")]
use rayon::prelude::*;

use crate::compare::{compare_grids, compare_series, Tolerance, Verdict};
use crate::error::SetupError;
use crate::manifest::{CasePaths, Manifest};
use crate::raster::load_raster;
use crate::series::load_series;

/// What kind of data a case compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    Raster,
    Timeseries,
}

impl fmt::Display for CaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseKind::Raster => write!(f, "raster"),
            CaseKind::Timeseries => write!(f, "timeseries"),
        }
    }
}

/// Per-case outcome: a comparison verdict, or the setup error that kept
/// the comparison from running at all.
#[derive(Debug)]
pub enum CaseStatus {
    Compared(Verdict),
    SetupFailed(SetupError),
}

#[derive(Debug)]
pub struct CaseReport {
    pub name: String,
    pub kind: CaseKind,
    pub status: CaseStatus,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        match &self.status {
            CaseStatus::Compared(verdict) => verdict.is_pass(),
            CaseStatus::SetupFailed(_) => false,
        }
    }
}

/// Settings shared by every case in a run.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    pub tolerance: Tolerance,
    /// Zero-based column compared for timeseries cases. Column 1 is water
    /// discharge in `catchment.dat`.
    pub series_column: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            series_column: 1,
        }
    }
}

/// Run every raster case in the manifest.
pub fn run_raster_cases(manifest: &Manifest, cfg: &RunConfig) -> Vec<CaseReport> {
    run_cases(manifest, CaseKind::Raster, |paths| {
        let result = load_raster(&paths.result)?;
        let expected = load_raster(&paths.expected)?;
        Ok(compare_grids(&result, &expected, &cfg.tolerance))
    })
}

/// Run every timeseries case in the manifest.
pub fn run_series_cases(manifest: &Manifest, cfg: &RunConfig) -> Vec<CaseReport> {
    run_cases(manifest, CaseKind::Timeseries, |paths| {
        let result = load_series(&paths.result, cfg.series_column)?;
        let expected = load_series(&paths.expected, cfg.series_column)?;
        Ok(compare_series(&result, &expected, &cfg.tolerance))
    })
}

/// True when every report passed. An empty run passes vacuously.
pub fn all_passed(reports: &[CaseReport]) -> bool {
    reports.iter().all(CaseReport::passed)
}

fn run_cases(
    manifest: &Manifest,
    kind: CaseKind,
    run_one: impl Fn(&CasePaths) -> Result<Verdict, SetupError> + Sync,
) -> Vec<CaseReport> {
    let entries: Vec<(&String, &CasePaths)> = manifest.cases.iter().collect();

    let build = |&(name, paths): &(&String, &CasePaths)| CaseReport {
        name: name.clone(),
        kind,
        status: match run_one(paths) {
            Ok(verdict) => CaseStatus::Compared(verdict),
            Err(err) => CaseStatus::SetupFailed(err),
        },
    };

    #[cfg(feature = "threading")]
    {
        entries.par_iter().map(build).collect()
    }
    #[cfg(not(feature = "threading"))]
    {
        entries.iter().map(build).collect()
    }
}
