use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// ConfoundError – every way loading confounds can fail
// ---------------------------------------------------------------------------

/// Errors raised while resolving a strategy against a confounds table.
///
/// All failures are immediate and synchronous; there is no retry or partial
/// recovery. The missing-column/keyword variants carry the complete list of
/// offenders so a user can fix their strategy in one pass.
#[derive(Debug, Error)]
pub enum ConfoundError {
    #[error("could not read confounds file {path}: {source}")]
    Read { path: PathBuf, source: csv::Error },

    #[error("could not write confounds file {path}: {source}")]
    Write { path: PathBuf, source: csv::Error },

    #[error("could not read json sidecar {path}: {source}")]
    SidecarRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse json sidecar {path}: {source}")]
    SidecarParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("row {row}: column '{column}' value '{value}' is not a number")]
    BadCell {
        row: usize,
        column: String,
        value: String,
    },

    #[error("confounds not found in the table: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("no confound matched keyword(s): {}", .0.join(", "))]
    MissingKeywords(Vec<String>),

    #[error("strategy selects duplicate confounds: {}", .0.join(", "))]
    DuplicateColumns(Vec<String>),

    #[error(
        "unknown strategy '{0}' (expected motion, high_pass, wm_csf, \
         global_signal, compcor, ica_aroma or scrub)"
    )]
    UnknownStrategy(String),

    #[error("unknown model '{0}' (expected basic, derivatives, power2 or full)")]
    UnknownModel(String),

    #[error("unknown compcor flavour '{0}' (expected anat or temp)")]
    UnknownCompCor(String),

    #[error("unknown scrub mode '{0}' (expected basic or full)")]
    UnknownScrub(String),

    #[error(
        "requested {requested} motion components, but only {available} \
         motion parameters are available"
    )]
    TooManyComponents { requested: usize, available: usize },

    #[error("could not find associated confound file for {path}")]
    NoConfoundFile { path: PathBuf },

    #[error("found more than one confound file for {path}")]
    AmbiguousConfoundFile { path: PathBuf },

    #[error("cannot concatenate tables with {left} and {right} rows")]
    RowCountMismatch { left: usize, right: usize },

    #[error("table data has {cells} columns but {names} column names")]
    ShapeMismatch { cells: usize, names: usize },
}
