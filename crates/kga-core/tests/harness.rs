//! End-to-end run over a fixture tree: both manifests, mixed outcomes.
//!
//! Builds a simulation-output directory and a known-good-answer directory
//! in a tempdir — ASCII rasters, a GeoTIFF pair, catchment timeseries —
//! then drives the full manifest → load → compare → report flow.

use std::fs;
use std::path::Path;

use kga_core::{
    all_passed, run_raster_cases, run_series_cases, CaseStatus, Location, Manifest, RunConfig,
    SetupError, Verdict,
};
use tiff::encoder::{colortype, TiffEncoder};

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
    fs::write(path, text).expect("write fixture");
}

/// Build an ESRI ASCII grid with per-cell values from `cell`.
fn make_asc(rows: usize, cols: usize, cell: impl Fn(usize, usize) -> f64) -> String {
    let mut s = format!(
        "ncols         {}\nnrows         {}\nxllcorner     0.0\nyllcorner     0.0\ncellsize      10.0\nNODATA_value  -9999\n",
        cols, rows
    );
    for r in 0..rows {
        let row: Vec<String> = (0..cols).map(|c| format!("{}", cell(r, c))).collect();
        s.push_str(&row.join(" "));
        s.push('\n');
    }
    s
}

fn write_f32_tiff(path: &Path, rows: usize, cols: usize, data: &[f32]) {
    fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
    let file = fs::File::create(path).expect("create tiff");
    let mut enc = TiffEncoder::new(file).expect("encoder");
    enc.write_image::<colortype::Gray32Float>(cols as u32, rows as u32, data)
        .expect("write tiff");
}

/// `catchment.dat`-style rows: hours, Qw, Jw, sand, Qs.
fn make_catchment(qw: &[f64]) -> String {
    let mut s = String::new();
    for (hour, q) in qw.iter().enumerate() {
        s.push_str(&format!(
            "{} {:.6} {:.6} 0.000000 {:.10}\n",
            hour,
            q,
            q,
            q * 1e-4
        ));
    }
    s
}

fn build_fixture_tree(root: &Path) {
    // Reference rasters: a 10×10 DEM of constant 100.0.
    write(&root.join("kga/dem.asc"), &make_asc(10, 10, |_, _| 100.0));
    write(&root.join("out/dem_pass.asc"), &make_asc(10, 10, |_, _| 100.0));
    // One regressed cell at (3, 4): 100.0 → 200.0, relative deviation 1.0.
    write(
        &root.join("out/dem_fail.asc"),
        &make_asc(10, 10, |r, c| if (r, c) == (3, 4) { 200.0 } else { 100.0 }),
    );
    // Wrong dimensions: 10×9.
    write(&root.join("out/dem_shape.asc"), &make_asc(10, 9, |_, _| 100.0));

    // A GeoTIFF water-depth pair, identical on both sides.
    let depth: Vec<f32> = (0..64).map(|i| 0.5 + i as f32 * 0.01).collect();
    write_f32_tiff(&root.join("kga/waterdepth.tif"), 8, 8, &depth);
    write_f32_tiff(&root.join("out/waterdepth.tif"), 8, 8, &depth);

    // Hydrographs.
    let qw: Vec<f64> = (0..24).map(|h| 0.5 + h as f64 * 0.05).collect();
    write(&root.join("kga/catchment.dat"), &make_catchment(&qw));
    write(&root.join("out/catchment_pass.dat"), &make_catchment(&qw));
    let mut qw_bad = qw.clone();
    qw_bad[7] *= 2.0;
    write(&root.join("out/catchment_fail.dat"), &make_catchment(&qw_bad));
    write(
        &root.join("out/catchment_short.dat"),
        &make_catchment(&qw[..12]),
    );

    write(
        &root.join("rasters.json"),
        r#"{
            "dem_identical": {"result": "out/dem_pass.asc", "expected": "kga/dem.asc"},
            "dem_regressed": {"result": "out/dem_fail.asc", "expected": "kga/dem.asc"},
            "dem_resized": {"result": "out/dem_shape.asc", "expected": "kga/dem.asc"},
            "dem_lost": {"result": "out/no_such.asc", "expected": "kga/dem.asc"},
            "waterdepth": {"result": "out/waterdepth.tif", "expected": "kga/waterdepth.tif"}
        }"#,
    );
    write(
        &root.join("timeseries.json"),
        r#"{
            "hydro_identical": {"result": "out/catchment_pass.dat", "expected": "kga/catchment.dat"},
            "hydro_regressed": {"result": "out/catchment_fail.dat", "expected": "kga/catchment.dat"},
            "hydro_truncated": {"result": "out/catchment_short.dat", "expected": "kga/catchment.dat"}
        }"#,
    );
}

#[test]
fn full_run_reports_every_case_independently() {
    let dir = tempfile::tempdir().expect("tempdir");
    build_fixture_tree(dir.path());
    let cfg = RunConfig::default();

    let rasters = Manifest::load(&dir.path().join("rasters.json")).expect("raster manifest");
    let reports = run_raster_cases(&rasters, &cfg);
    assert_eq!(reports.len(), 5);

    let by_name = |name: &str| {
        reports
            .iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("no report named {}", name))
    };

    match &by_name("dem_identical").status {
        CaseStatus::Compared(Verdict::Pass { max_rel_dev }) => {
            assert_eq!(*max_rel_dev, 0.0, "identical grids should deviate by 0");
        }
        other => panic!("dem_identical: expected Pass, got {:?}", other),
    }

    match &by_name("dem_regressed").status {
        CaseStatus::Compared(Verdict::ToleranceExceeded {
            max_rel_dev,
            exceeding,
        }) => {
            assert_eq!(exceeding.len(), 1);
            assert_eq!(exceeding[0].location, Location::Cell { row: 3, col: 4 });
            assert!((*max_rel_dev - 1.0).abs() < 1e-12);
        }
        other => panic!("dem_regressed: expected ToleranceExceeded, got {:?}", other),
    }

    assert!(
        matches!(
            by_name("dem_resized").status,
            CaseStatus::Compared(Verdict::ShapeMismatch { .. })
        ),
        "10×9 against 10×10 should be a shape mismatch"
    );

    assert!(
        matches!(
            by_name("dem_lost").status,
            CaseStatus::SetupFailed(SetupError::RasterUnreadable { .. })
        ),
        "missing result file should be a setup error, not a panic"
    );

    assert!(by_name("waterdepth").passed(), "identical TIFF pair should pass");

    // One bad case must not contaminate the aggregate of its siblings.
    assert!(!all_passed(&reports));
    let passing: Vec<_> = reports.iter().filter(|r| r.passed()).collect();
    assert_eq!(passing.len(), 2);
}

#[test]
fn timeseries_run_mixes_verdicts_by_case() {
    let dir = tempfile::tempdir().expect("tempdir");
    build_fixture_tree(dir.path());
    let cfg = RunConfig::default();

    let manifest = Manifest::load(&dir.path().join("timeseries.json")).expect("series manifest");
    let reports = run_series_cases(&manifest, &cfg);
    assert_eq!(reports.len(), 3);

    // BTreeMap order: hydro_identical, hydro_regressed, hydro_truncated.
    assert!(reports[0].passed());

    match &reports[1].status {
        CaseStatus::Compared(Verdict::ToleranceExceeded { exceeding, .. }) => {
            assert_eq!(exceeding.len(), 1);
            assert_eq!(exceeding[0].location, Location::Step { index: 7 });
        }
        other => panic!("hydro_regressed: expected ToleranceExceeded, got {:?}", other),
    }

    assert!(matches!(
        reports[2].status,
        CaseStatus::Compared(Verdict::ShapeMismatch { .. })
    ));
    assert!(!all_passed(&reports));
}

#[test]
fn sedigraph_column_is_selectable() {
    let dir = tempfile::tempdir().expect("tempdir");
    build_fixture_tree(dir.path());
    // Column 4 (Qs) differs by the same factor wherever Qw differs, so the
    // regressed pair still fails when comparing the sedigraph column.
    let cfg = RunConfig {
        series_column: 4,
        ..RunConfig::default()
    };

    let manifest = Manifest::load(&dir.path().join("timeseries.json")).expect("series manifest");
    let reports = run_series_cases(&manifest, &cfg);
    assert!(reports[0].passed(), "identical sedigraph should pass");
    assert!(!reports[1].passed(), "regressed sedigraph should fail");
}

#[test]
fn missing_manifest_aborts_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = Manifest::load(&dir.path().join("rasters.json")).unwrap_err();
    assert!(matches!(err, SetupError::ManifestNotFound { .. }));
}
