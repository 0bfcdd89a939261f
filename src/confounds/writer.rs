use std::path::Path;

use log::info;

use super::error::ConfoundError;
use super::model::ConfoundTable;

// ---------------------------------------------------------------------------
// TSV output
// ---------------------------------------------------------------------------

/// Write a table as tab-separated values, NaN rendered as `n/a`.
///
/// When a sample mask is given, only the listed rows are written (scrubbed
/// frames are dropped from the output).
pub fn write_table(
    path: &Path,
    table: &ConfoundTable,
    sample_mask: Option<&[usize]>,
) -> Result<(), ConfoundError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|source| ConfoundError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    let wrap = |source| ConfoundError::Write {
        path: path.to_path_buf(),
        source,
    };

    writer.write_record(&table.columns).map_err(wrap)?;
    let rows: Vec<usize> = match sample_mask {
        Some(mask) => mask.to_vec(),
        None => (0..table.n_rows()).collect(),
    };
    for i in rows {
        let record: Vec<String> = table
            .data
            .row(i)
            .iter()
            .map(|v| format_cell(*v))
            .collect();
        writer.write_record(&record).map_err(wrap)?;
    }
    writer.flush().map_err(|source| ConfoundError::Write {
        path: path.to_path_buf(),
        source: csv::Error::from(source),
    })?;

    info!(
        "wrote {} columns x {} rows to {}",
        table.n_cols(),
        sample_mask.map_or(table.n_rows(), |m| m.len()),
        path.display()
    );
    Ok(())
}

fn format_cell(v: f64) -> String {
    if v.is_nan() {
        "n/a".to_string()
    } else {
        v.to_string()
    }
}
