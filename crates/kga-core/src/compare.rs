//! Element-wise comparison of produced output against a known good answer.
//!
//! Two same-shape containers pass when every element's relative deviation
//! `|result − expected| / max(|expected|, zero_floor)` is within tolerance.
//! Shape mismatch is a test failure in its own right and short-circuits
//! before any element work. NaN cells (nodata) match NaN and nothing else.

use std::fmt;

use crate::grid::Grid;

/// Relative tolerance settings.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Maximum permitted relative deviation per element.
    pub rtol: f64,
    /// Floor applied to the reference magnitude, so near-zero expected
    /// values do not turn rounding noise into huge ratios.
    pub zero_floor: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: 1e-3,
            zero_floor: 1e-12,
        }
    }
}

impl Tolerance {
    /// Default zero_floor with a caller-chosen rtol.
    pub fn with_rtol(rtol: f64) -> Self {
        Self {
            rtol,
            ..Self::default()
        }
    }
}

/// Shape of a comparable container, for mismatch reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Grid { rows: usize, cols: usize },
    Series { len: usize },
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Grid { rows, cols } => write!(f, "{}×{}", rows, cols),
            Shape::Series { len } => write!(f, "{} steps", len),
        }
    }
}

/// Position of one element: a grid cell or a timeseries step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Cell { row: usize, col: usize },
    Step { index: usize },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Cell { row, col } => write!(f, "({}, {})", row, col),
            Location::Step { index } => write!(f, "step {}", index),
        }
    }
}

/// One element whose relative deviation exceeds tolerance.
#[derive(Debug, Clone, Copy)]
pub struct Deviation {
    pub location: Location,
    /// Relative deviation at this location. Infinite when exactly one side
    /// is NaN.
    pub rel_dev: f64,
}

/// Outcome of comparing one (result, expected) pair.
#[derive(Debug, Clone)]
pub enum Verdict {
    Pass {
        max_rel_dev: f64,
    },
    ShapeMismatch {
        result: Shape,
        expected: Shape,
    },
    ToleranceExceeded {
        max_rel_dev: f64,
        /// Every offending location, in scan order.
        exceeding: Vec<Deviation>,
    },
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass { .. })
    }

    /// The worst offending element, if the verdict is ToleranceExceeded.
    pub fn worst(&self) -> Option<Deviation> {
        match self {
            Verdict::ToleranceExceeded { exceeding, .. } => exceeding
                .iter()
                .copied()
                .max_by(|a, b| a.rel_dev.total_cmp(&b.rel_dev)),
            _ => None,
        }
    }
}

/// Relative deviation of one element pair.
///
/// Exact equality (covers equal infinities) and NaN-vs-NaN are deviation 0;
/// NaN on exactly one side is infinite deviation.
fn rel_dev(result: f64, expected: f64, tol: &Tolerance) -> f64 {
    if result == expected || (result.is_nan() && expected.is_nan()) {
        return 0.0;
    }
    if result.is_nan() || expected.is_nan() {
        return f64::INFINITY;
    }
    (result - expected).abs() / expected.abs().max(tol.zero_floor)
}

fn compare_values(
    result: &[f64],
    expected: &[f64],
    tol: &Tolerance,
    locate: impl Fn(usize) -> Location,
) -> Verdict {
    let mut max_rel_dev = 0.0f64;
    let mut exceeding = Vec::new();

    for (i, (&a, &b)) in result.iter().zip(expected.iter()).enumerate() {
        let dev = rel_dev(a, b, tol);
        max_rel_dev = max_rel_dev.max(dev);
        if dev > tol.rtol {
            exceeding.push(Deviation {
                location: locate(i),
                rel_dev: dev,
            });
        }
    }

    if exceeding.is_empty() {
        Verdict::Pass { max_rel_dev }
    } else {
        Verdict::ToleranceExceeded {
            max_rel_dev,
            exceeding,
        }
    }
}

/// Compare two raster grids element-wise.
pub fn compare_grids(result: &Grid, expected: &Grid, tol: &Tolerance) -> Verdict {
    if result.shape() != expected.shape() {
        return Verdict::ShapeMismatch {
            result: Shape::Grid {
                rows: result.rows,
                cols: result.cols,
            },
            expected: Shape::Grid {
                rows: expected.rows,
                cols: expected.cols,
            },
        };
    }
    let cols = expected.cols;
    compare_values(&result.data, &expected.data, tol, |i| Location::Cell {
        row: i / cols,
        col: i % cols,
    })
}

/// Compare two timeseries columns element-wise.
pub fn compare_series(result: &[f64], expected: &[f64], tol: &Tolerance) -> Verdict {
    if result.len() != expected.len() {
        return Verdict::ShapeMismatch {
            result: Shape::Series { len: result.len() },
            expected: Shape::Series {
                len: expected.len(),
            },
        };
    }
    compare_values(result, expected, tol, |i| Location::Step { index: i })
}
