//! Raster loading: band 1 of a georeferenced grid file as a [`Grid`].
//!
//! Two formats are understood: ESRI ASCII grids (`.asc`/`.txt`), the native
//! HAIL-CAESAR output format, and GeoTIFF for any other extension. Header
//! georeferencing (corner coordinates, cellsize) is validated where the
//! format carries it, then discarded. Cells equal to the declared nodata
//! value load as NaN.

use std::fs;
use std::io::{self, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};

use crate::error::SetupError;
use crate::grid::Grid;

/// Load the first band of a raster file.
pub fn load_raster(path: &Path) -> Result<Grid, SetupError> {
    let unreadable = |reason: String| SetupError::RasterUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("asc") | Some("txt") => {
            let text = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
            parse_ascii_grid(&text).map_err(unreadable)
        }
        _ => {
            let file = fs::File::open(path).map_err(|e| unreadable(e.to_string()))?;
            decode_tiff(io::BufReader::new(file)).map_err(unreadable)
        }
    }
}

/// Parse an ESRI ASCII grid.
///
/// Header lines carry `key value` pairs (`ncols`, `nrows`, `xllcorner`,
/// `yllcorner`, `cellsize`, optional `NODATA_value`; keys case-insensitive,
/// any order), followed by `nrows` rows of `ncols` whitespace-delimited
/// values. A line whose first token parses as a number starts the data
/// block, so `nan` cells are data, not header keys.
pub(crate) fn parse_ascii_grid(text: &str) -> Result<Grid, String> {
    let mut ncols: Option<usize> = None;
    let mut nrows: Option<usize> = None;
    let mut nodata: Option<f64> = None;
    let mut data: Vec<f64> = Vec::new();
    let mut in_header = true;

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };

        if in_header && first.parse::<f64>().is_err() {
            let value = tokens
                .next()
                .ok_or_else(|| format!("header line {}: `{}` has no value", i + 1, first))?;
            match first.to_ascii_lowercase().as_str() {
                "ncols" => {
                    ncols = Some(parse_header::<usize>("ncols", value, i)?);
                }
                "nrows" => {
                    nrows = Some(parse_header::<usize>("nrows", value, i)?);
                }
                // Georeferencing: validated numeric, not retained.
                "xllcorner" | "yllcorner" | "cellsize" => {
                    parse_header::<f64>(first, value, i)?;
                }
                "nodata_value" => {
                    nodata = Some(parse_header::<f64>("NODATA_value", value, i)?);
                }
                other => return Err(format!("line {}: unknown header key `{}`", i + 1, other)),
            }
        } else {
            in_header = false;
            for tok in std::iter::once(first).chain(tokens) {
                let v: f64 = tok
                    .parse()
                    .map_err(|_| format!("line {}: bad cell value `{}`", i + 1, tok))?;
                data.push(v);
            }
        }
    }

    let cols = ncols.ok_or("missing ncols header")?;
    let rows = nrows.ok_or("missing nrows header")?;
    if data.len() != rows * cols {
        return Err(format!(
            "expected {}×{} = {} cells, found {}",
            rows,
            cols,
            rows * cols,
            data.len()
        ));
    }

    if let Some(nd) = nodata {
        for v in &mut data {
            if *v == nd {
                *v = f64::NAN;
            }
        }
    }

    Ok(Grid { data, rows, cols })
}

fn parse_header<T: std::str::FromStr>(key: &str, value: &str, line: usize) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("line {}: bad {} value `{}`", line + 1, key, value))
}

/// Decode the first image of a TIFF as a single-band grid, widening any
/// sample type to f64. Multi-sample pixels (e.g. RGB) are rejected by the
/// sample-count check.
pub(crate) fn decode_tiff<R: Read + Seek>(reader: R) -> Result<Grid, String> {
    let mut decoder = Decoder::new(reader).map_err(|e| format!("not a valid TIFF: {}", e))?;
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| format!("dimensions error: {}", e))?;
    let (cols, rows) = (width as usize, height as usize);
    let img = decoder
        .read_image()
        .map_err(|e| format!("read_image error: {}", e))?;

    let data: Vec<f64> = match img {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
    };

    if data.len() != rows * cols {
        return Err(format!(
            "decoded {} samples for a {}×{} image; band 1 must be single-sample",
            data.len(),
            rows,
            cols
        ));
    }

    Ok(Grid { data, rows, cols })
}
