use std::collections::BTreeSet;

use ndarray::Array2;

use super::error::ConfoundError;
use super::model::ConfoundTable;
use super::select::ScrubMode;

// ---------------------------------------------------------------------------
// High-motion frame detection
// ---------------------------------------------------------------------------

/// Indices of frames exceeding the framewise-displacement or standardized
/// DVARS thresholds. NaN (the first frame of both series) never flags.
pub fn motion_outliers(
    table: &ConfoundTable,
    fd_thresh: f64,
    std_dvars_thresh: f64,
) -> Result<Vec<usize>, ConfoundError> {
    let mut missing = Vec::new();
    if table.column("framewise_displacement").is_none() {
        missing.push("framewise_displacement".to_string());
    }
    if table.column("std_dvars").is_none() {
        missing.push("std_dvars".to_string());
    }
    if !missing.is_empty() {
        return Err(ConfoundError::MissingColumns(missing));
    }
    let fd = table.column("framewise_displacement").expect("checked above");
    let dvars = table.column("std_dvars").expect("checked above");

    Ok((0..table.n_rows())
        .filter(|&i| fd[i] > fd_thresh || dvars[i] > std_dvars_thresh)
        .collect())
}

/// Extend a sorted outlier list so that no retained segment is shorter than
/// five frames (Power et al. 2014, NeuroImage 84:320-341).
///
/// Three passes: pad the start when the leading clean segment is short, pad
/// the end likewise, then fill interior gaps of one to four clean frames.
pub fn optimize_scrub(outliers: &[usize], n_scans: usize) -> Vec<usize> {
    if outliers.is_empty() {
        return Vec::new();
    }
    let mut extended: BTreeSet<usize> = outliers.iter().copied().collect();

    let first = outliers[0];
    if first < 5 {
        extended.extend(0..first);
    }
    let last = outliers[outliers.len() - 1];
    if n_scans - (last + 1) < 5 {
        extended.extend(last..n_scans);
    }
    for pair in outliers.windows(2) {
        let gap = pair[1] - pair[0];
        if gap > 1 && gap < 6 {
            extended.extend(pair[0] + 1..pair[1]);
        }
    }
    extended.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Spike regressors
// ---------------------------------------------------------------------------

/// Build one-hot spike regressors for the frames to scrub, plus the sample
/// mask of retained frame indices.
///
/// Every scrubbed frame gets its own `motion_outlier_<k>` column holding a
/// single 1 at that frame; regressing these out is equivalent to censoring
/// the frame.
pub fn spike_regressors(
    table: &ConfoundTable,
    mode: ScrubMode,
    fd_thresh: f64,
    std_dvars_thresh: f64,
) -> Result<(ConfoundTable, Vec<usize>), ConfoundError> {
    let n_scans = table.n_rows();
    let mut outliers = motion_outliers(table, fd_thresh, std_dvars_thresh)?;
    if mode == ScrubMode::Full {
        outliers = optimize_scrub(&outliers, n_scans);
    }

    let mut data = Array2::zeros((n_scans, outliers.len()));
    for (k, &frame) in outliers.iter().enumerate() {
        data[[frame, k]] = 1.0;
    }
    let columns = (0..outliers.len())
        .map(|k| format!("motion_outlier_{k}"))
        .collect();

    let scrubbed: BTreeSet<usize> = outliers.into_iter().collect();
    let sample_mask = (0..n_scans).filter(|i| !scrubbed.contains(i)).collect();

    Ok((ConfoundTable::new(columns, data)?, sample_mask))
}
