//! Setup-error taxonomy for the harness.
//!
//! These are environment failures (missing or undecodable input files), as
//! opposed to comparison failures, which are ordinary verdicts reported by
//! [`crate::compare`]. A setup error is fatal for the case it belongs to;
//! manifest errors are fatal for the whole run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    /// The manifest file is absent or cannot be read at all.
    #[error("manifest not found: {}", .path.display())]
    ManifestNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The manifest parsed as JSON but does not match the expected
    /// case-name → {result, expected} shape.
    #[error("manifest malformed: {}: {reason}", .path.display())]
    ManifestMalformed { path: PathBuf, reason: String },

    /// A raster file could not be opened or decoded.
    #[error("raster unreadable: {}: {reason}", .path.display())]
    RasterUnreadable { path: PathBuf, reason: String },

    /// A timeseries file is absent or a row failed to parse as numeric at
    /// the requested column.
    #[error("timeseries unreadable: {}: {reason}", .path.display())]
    TimeseriesUnreadable { path: PathBuf, reason: String },
}
