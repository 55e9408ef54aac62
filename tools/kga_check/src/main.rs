//! KGA regression check: runs every case in the raster and timeseries
//! manifests against stored known good answers, prints one line per case,
//! optionally writes a JSON report, and exits non-zero on any regression.
//!
//! A missing manifest is an unrecoverable environment error and aborts the
//! whole run; an unreadable data file only fails its own case.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use kga_core::{
    all_passed, run_raster_cases, run_series_cases, CaseReport, CaseStatus, Manifest, RunConfig,
    Tolerance, Verdict,
};

#[derive(Parser, Debug)]
#[command(
    name = "kga_check",
    about = "Compare model output rasters and timeseries against known good answers"
)]
struct Args {
    /// Raster case manifest.
    #[arg(long, default_value = "known_good_answers/rasters.json")]
    rasters: PathBuf,

    /// Timeseries case manifest.
    #[arg(long, default_value = "known_good_answers/timeseries.json")]
    timeseries: PathBuf,

    /// Maximum relative deviation per element.
    #[arg(short, long, default_value = "1e-3")]
    tolerance: f64,

    /// Zero-based column compared for timeseries cases (1 = water discharge
    /// in catchment.dat).
    #[arg(short, long, default_value = "1")]
    column: usize,

    /// Run only the case with this name (searched in both manifests).
    #[arg(long)]
    case: Option<String>,

    /// Write a JSON run report to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

// ── JSON report ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct RunReport {
    passed: bool,
    cases: Vec<CaseLine>,
}

#[derive(Serialize)]
struct CaseLine {
    name: String,
    kind: String,
    status: &'static str,
    detail: String,
}

fn case_line(report: &CaseReport) -> CaseLine {
    let (status, detail) = match &report.status {
        CaseStatus::Compared(Verdict::Pass { max_rel_dev }) => {
            ("pass", format!("max rel dev {:.3e}", max_rel_dev))
        }
        CaseStatus::Compared(Verdict::ShapeMismatch { result, expected }) => (
            "fail",
            format!("shape mismatch: result {} vs expected {}", result, expected),
        ),
        CaseStatus::Compared(Verdict::ToleranceExceeded {
            max_rel_dev,
            exceeding,
        }) => {
            let worst = exceeding
                .iter()
                .max_by(|a, b| a.rel_dev.total_cmp(&b.rel_dev))
                .map(|d| d.location.to_string())
                .unwrap_or_default();
            (
                "fail",
                format!(
                    "{} elements over tolerance, worst at {} (rel dev {:.3e})",
                    exceeding.len(),
                    worst,
                    max_rel_dev
                ),
            )
        }
        CaseStatus::SetupFailed(err) => ("error", err.to_string()),
    };
    CaseLine {
        name: report.name.clone(),
        kind: report.kind.to_string(),
        status,
        detail,
    }
}

// ── Run ──────────────────────────────────────────────────────────────────────

/// Keep only the named case, when a filter is given.
fn filter_manifest(manifest: Manifest, filter: Option<&str>) -> Manifest {
    match filter {
        Some(name) => Manifest {
            cases: manifest
                .cases
                .into_iter()
                .filter(|(case, _)| case == name)
                .collect(),
        },
        None => manifest,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = RunConfig {
        tolerance: Tolerance::with_rtol(args.tolerance),
        series_column: args.column,
    };
    let filter = args.case.as_deref();

    let rasters = Manifest::load(&args.rasters)
        .with_context(|| format!("cannot load raster manifest {}", args.rasters.display()))?;
    let rasters = filter_manifest(rasters, filter);
    eprintln!(
        "[kga_check] {} raster cases from {}",
        rasters.len(),
        args.rasters.display()
    );

    let series = Manifest::load(&args.timeseries)
        .with_context(|| format!("cannot load timeseries manifest {}", args.timeseries.display()))?;
    let series = filter_manifest(series, filter);
    eprintln!(
        "[kga_check] {} timeseries cases from {}",
        series.len(),
        args.timeseries.display()
    );

    let mut reports = run_raster_cases(&rasters, &cfg);
    reports.extend(run_series_cases(&series, &cfg));

    if let Some(name) = filter {
        if reports.is_empty() {
            bail!("no case named `{}` in either manifest", name);
        }
    }

    let lines: Vec<CaseLine> = reports.iter().map(case_line).collect();
    for line in &lines {
        eprintln!(
            "[kga_check] {} {} {}: {}",
            line.status.to_uppercase(),
            line.kind,
            line.name,
            line.detail
        );
    }

    let failed = reports.iter().filter(|r| !r.passed()).count();
    eprintln!(
        "[kga_check] {} of {} cases passed",
        reports.len() - failed,
        reports.len()
    );

    if let Some(path) = &args.report {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create report dir {}", parent.display()))?;
        }
        let run = RunReport {
            passed: all_passed(&reports),
            cases: lines,
        };
        fs::write(path, serde_json::to_string_pretty(&run)?)
            .with_context(|| format!("cannot write report {}", path.display()))?;
        eprintln!("[kga_check] report written to {}", path.display());
    }

    if failed > 0 {
        bail!("{} of {} cases did not pass", failed, reports.len());
    }
    Ok(())
}
