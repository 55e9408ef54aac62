//! Manifest loading: named (result, expected) file pairs.
//!
//! A manifest is a JSON object mapping case name to exactly two paths, e.g.
//! `{"case1": {"result": "out/dem.asc", "expected": "kga/dem.asc"}}`.
//! Two manifests exist by convention: one for raster cases, one for
//! timeseries cases. Relative paths resolve against the manifest file's
//! own directory so a fixture tree can be checked out anywhere.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::SetupError;

/// The produced file and its stored known good answer for one case.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CasePaths {
    pub result: PathBuf,
    pub expected: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Manifest {
    /// Case name → file pair, sorted by name so runs are deterministic.
    pub cases: BTreeMap<String, CasePaths>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let text = fs::read_to_string(path).map_err(|source| SetupError::ManifestNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cases: BTreeMap<String, CasePaths> =
            serde_json::from_str(&text).map_err(|e| SetupError::ManifestMalformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if let Some(base) = path.parent() {
            for pair in cases.values_mut() {
                pair.result = resolve(base, &pair.result);
                pair.expected = resolve(base, &pair.expected);
            }
        }

        Ok(Self { cases })
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

fn resolve(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
