use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1, Axis};
use serde::Deserialize;

use super::error::ConfoundError;

// ---------------------------------------------------------------------------
// ConfoundTable – the in-memory confounds table
// ---------------------------------------------------------------------------

/// A numeric table: rows are time points (fMRI volumes), columns are named
/// confound regressors. Cells that were `n/a` in the source TSV are NaN.
#[derive(Debug, Clone)]
pub struct ConfoundTable {
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Row-major data, shape `(n_rows, columns.len())`.
    pub data: Array2<f64>,
}

impl ConfoundTable {
    /// Build a table, checking that names and data agree on width.
    pub fn new(columns: Vec<String>, data: Array2<f64>) -> Result<Self, ConfoundError> {
        if columns.len() != data.ncols() {
            return Err(ConfoundError::ShapeMismatch {
                cells: data.ncols(),
                names: columns.len(),
            });
        }
        Ok(ConfoundTable { columns, data })
    }

    /// A table with rows but no columns, used as the concatenation seed.
    pub fn empty(n_rows: usize) -> Self {
        ConfoundTable {
            columns: Vec::new(),
            data: Array2::zeros((n_rows, 0)),
        }
    }

    /// Number of time points.
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of confound columns.
    pub fn n_cols(&self) -> usize {
        self.data.ncols()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// View of a single column by name.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|i| self.data.column(i))
    }

    /// Select a subset of columns by name, in the given order.
    ///
    /// Every requested name must exist; the error carries the full list of
    /// missing names.
    pub fn select(&self, names: &[String]) -> Result<ConfoundTable, ConfoundError> {
        let mut missing = Vec::new();
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            match self.column_index(name) {
                Some(i) => indices.push(i),
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(ConfoundError::MissingColumns(missing));
        }

        let data = self.data.select(Axis(1), &indices);
        ConfoundTable::new(names.to_vec(), data)
    }

    /// Columns whose name contains `keyword`, in table order.
    pub fn columns_matching(&self, keyword: &str) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.contains(keyword))
            .cloned()
            .collect()
    }

    /// Horizontally concatenate a list of tables into one.
    ///
    /// All tables must share a row count and the combined column names must
    /// be unique ("your strategy has duplicate confounds").
    pub fn concat(groups: Vec<ConfoundTable>, n_rows: usize) -> Result<ConfoundTable, ConfoundError> {
        let mut out = ConfoundTable::empty(n_rows);
        for group in groups {
            if group.n_rows() != out.n_rows() {
                return Err(ConfoundError::RowCountMismatch {
                    left: out.n_rows(),
                    right: group.n_rows(),
                });
            }
            let views = [out.data.view(), group.data.view()];
            let data = ndarray::concatenate(Axis(1), &views)
                .expect("row counts checked above");
            out.columns.extend(group.columns);
            out.data = data;
        }

        let mut seen = BTreeMap::new();
        for name in &out.columns {
            *seen.entry(name.clone()).or_insert(0usize) += 1;
        }
        let duplicates: Vec<String> = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name)
            .collect();
        if !duplicates.is_empty() {
            return Err(ConfoundError::DuplicateColumns(duplicates));
        }
        Ok(out)
    }

    /// Replace NaN cells in the first row by the value at the second time
    /// point. Derivative columns computed by fMRIprep have no value at t=0
    /// and the regression step downstream cannot digest NaN.
    pub fn repair_first_row(&mut self) {
        if self.n_rows() < 2 {
            return;
        }
        for j in 0..self.n_cols() {
            if self.data[[0, j]].is_nan() {
                self.data[[0, j]] = self.data[[1, j]];
            }
        }
    }

    /// Subtract the column mean from every column (over time).
    pub fn demean(&mut self) {
        if self.n_rows() == 0 {
            return;
        }
        if let Some(mean) = self.data.mean_axis(Axis(0)) {
            self.data -= &mean;
        }
    }
}

// ---------------------------------------------------------------------------
// JSON sidecar – per-column metadata written by fMRIprep
// ---------------------------------------------------------------------------

/// Metadata for one confound column, e.g. which mask a CompCor component was
/// computed from and how much variance it explains.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ComponentInfo {
    #[serde(rename = "Method")]
    pub method: Option<String>,
    #[serde(rename = "Mask")]
    pub mask: Option<String>,
    #[serde(rename = "Retained")]
    pub retained: Option<bool>,
    #[serde(rename = "VarianceExplained")]
    pub variance_explained: Option<f64>,
    #[serde(rename = "CumulativeVarianceExplained")]
    pub cumulative_variance_explained: Option<f64>,
}

/// The whole sidecar: column name → metadata.
pub type ConfoundMetadata = BTreeMap<String, ComponentInfo>;
