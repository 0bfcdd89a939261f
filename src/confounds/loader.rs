use std::path::{Path, PathBuf};

use log::debug;
use ndarray::Array2;

use super::error::ConfoundError;
use super::model::{ConfoundMetadata, ConfoundTable};

// fmriprep renamed the confounds file between v20.1.1 and v20.2.0 with
// respect to BEP 012, so both names must be tried.
const CONFOUND_FILE_SUFFIXES: [&str; 2] = [
    "_desc-confounds_timeseries.tsv",
    "_desc-confounds_regressors.tsv",
];

// ---------------------------------------------------------------------------
// TSV loading
// ---------------------------------------------------------------------------

/// Read a tab-separated confounds file into a [`ConfoundTable`].
///
/// The file must have a header row. `n/a` and empty cells become NaN; any
/// other non-numeric cell is an error naming the row and column.
pub fn load_table(path: &Path) -> Result<ConfoundTable, ConfoundError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|source| ConfoundError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|source| ConfoundError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut cells: Vec<f64> = Vec::new();
    let mut n_rows = 0usize;
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|source| ConfoundError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        for (col_no, field) in record.iter().enumerate() {
            let column = columns
                .get(col_no)
                .cloned()
                .unwrap_or_else(|| col_no.to_string());
            cells.push(parse_cell(field, row_no, &column)?);
        }
        n_rows += 1;
    }

    // The csv reader enforces equal record lengths, so the shape always
    // agrees with the header here.
    let width = if n_rows == 0 { columns.len() } else { cells.len() / n_rows };
    let data = Array2::from_shape_vec((n_rows, width), cells).map_err(|_| {
        ConfoundError::ShapeMismatch {
            cells: width,
            names: columns.len(),
        }
    })?;

    debug!(
        "loaded {} with {} time points and {} confounds",
        path.display(),
        data.nrows(),
        data.ncols()
    );
    ConfoundTable::new(columns, data)
}

fn parse_cell(field: &str, row: usize, column: &str) -> Result<f64, ConfoundError> {
    let trimmed = field.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
        return Ok(f64::NAN);
    }
    trimmed.parse::<f64>().map_err(|_| ConfoundError::BadCell {
        row,
        column: column.to_string(),
        value: field.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Companion file discovery
// ---------------------------------------------------------------------------

/// Derive the confounds TSV path from an fMRI image file name.
///
/// fMRIprep derivatives share a BIDS stem up to the `_space-` entity, e.g.
/// `sub-01_task-rest_space-MNI152NLin2009cAsym_desc-preproc_bold.nii.gz`
/// sits next to `sub-01_task-rest_desc-confounds_timeseries.tsv`. Exactly
/// one of the two historical confound file names must exist.
pub fn find_confounds_file(image_path: &Path) -> Result<PathBuf, ConfoundError> {
    let name = image_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ConfoundError::NoConfoundFile {
            path: image_path.to_path_buf(),
        })?;

    let stem_end = name
        .find("_space-")
        .ok_or_else(|| ConfoundError::NoConfoundFile {
            path: image_path.to_path_buf(),
        })?;
    let stem = &name[..stem_end];
    let parent = image_path.parent().unwrap_or_else(|| Path::new(""));

    let existing: Vec<PathBuf> = CONFOUND_FILE_SUFFIXES
        .iter()
        .map(|suffix| parent.join(format!("{stem}{suffix}")))
        .filter(|candidate| candidate.exists())
        .collect();

    match existing.len() {
        0 => Err(ConfoundError::NoConfoundFile {
            path: image_path.to_path_buf(),
        }),
        1 => Ok(existing.into_iter().next().expect("length checked")),
        _ => Err(ConfoundError::AmbiguousConfoundFile {
            path: image_path.to_path_buf(),
        }),
    }
}

/// Resolve any accepted input (a TSV path or an image path) to the TSV.
pub fn resolve_input(path: &Path) -> Result<PathBuf, ConfoundError> {
    let is_tsv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tsv"))
        .unwrap_or(false);
    if is_tsv {
        Ok(path.to_path_buf())
    } else {
        find_confounds_file(path)
    }
}

// ---------------------------------------------------------------------------
// JSON sidecar
// ---------------------------------------------------------------------------

/// Load the JSON companion of a confounds TSV, if present.
///
/// An absent sidecar is not an error; it only matters for strategies that
/// consult per-column metadata (anatomical CompCor mask selection).
pub fn load_sidecar(tsv_path: &Path) -> Result<Option<ConfoundMetadata>, ConfoundError> {
    let json_path = tsv_path.with_extension("json");
    if !json_path.exists() {
        debug!("no json sidecar at {}", json_path.display());
        return Ok(None);
    }
    let text = std::fs::read_to_string(&json_path).map_err(|source| {
        ConfoundError::SidecarRead {
            path: json_path.clone(),
            source,
        }
    })?;
    let meta: ConfoundMetadata =
        serde_json::from_str(&text).map_err(|source| ConfoundError::SidecarParse {
            path: json_path,
            source,
        })?;
    Ok(Some(meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tsv(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_tsv_with_na_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(
            dir.path(),
            "confounds.tsv",
            "trans_x\ttrans_x_derivative1\n0.1\tn/a\n0.2\t0.1\n",
        );
        let table = load_table(&path).unwrap();
        assert_eq!(table.columns, vec!["trans_x", "trans_x_derivative1"]);
        assert_eq!(table.n_rows(), 2);
        assert!(table.data[[0, 1]].is_nan());
        assert_eq!(table.data[[1, 1]], 0.1);
    }

    #[test]
    fn rejects_non_numeric_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(dir.path(), "bad.tsv", "trans_x\nhello\n");
        let err = load_table(&path).unwrap_err();
        match err {
            ConfoundError::BadCell { row, column, value } => {
                assert_eq!(row, 0);
                assert_eq!(column, "trans_x");
                assert_eq!(value, "hello");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_table(Path::new("does_not_exist.tsv")).is_err());
    }

    #[test]
    fn discovers_companion_tsv_from_image_name() {
        let dir = tempfile::tempdir().unwrap();
        let tsv = write_tsv(
            dir.path(),
            "sub-01_task-rest_desc-confounds_timeseries.tsv",
            "trans_x\n0.0\n",
        );
        let image = dir
            .path()
            .join("sub-01_task-rest_space-MNI152NLin2009cAsym_desc-preproc_bold.nii.gz");
        assert_eq!(find_confounds_file(&image).unwrap(), tsv);
    }

    #[test]
    fn ambiguous_companions_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_tsv(
            dir.path(),
            "sub-01_desc-confounds_timeseries.tsv",
            "trans_x\n0.0\n",
        );
        write_tsv(
            dir.path(),
            "sub-01_desc-confounds_regressors.tsv",
            "trans_x\n0.0\n",
        );
        let image = dir.path().join("sub-01_space-T1w_desc-preproc_bold.nii.gz");
        assert!(matches!(
            find_confounds_file(&image),
            Err(ConfoundError::AmbiguousConfoundFile { .. })
        ));
    }

    #[test]
    fn sidecar_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let tsv = write_tsv(dir.path(), "confounds.tsv", "csf\n0.0\n");
        assert!(load_sidecar(&tsv).unwrap().is_none());

        write_tsv(
            dir.path(),
            "confounds.json",
            r#"{"a_comp_cor_00": {"Mask": "combined", "Retained": true}}"#,
        );
        let meta = load_sidecar(&tsv).unwrap().unwrap();
        assert_eq!(
            meta["a_comp_cor_00"].mask.as_deref(),
            Some("combined")
        );
    }
}
