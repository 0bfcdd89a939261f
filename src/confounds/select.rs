use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info};

use super::error::ConfoundError;
use super::loader;
use super::model::{ConfoundMetadata, ConfoundTable};
use super::pca;
use super::scrub;

/// The six rigid-body head motion parameters estimated by fMRIprep.
pub const MOTION_PARAMS: [&str; 6] =
    ["trans_x", "trans_y", "trans_z", "rot_x", "rot_y", "rot_z"];

const HIGH_PASS_KEYWORD: &str = "cosine";
const AROMA_KEYWORD: &str = "aroma_motion";

// ---------------------------------------------------------------------------
// Strategy vocabulary
// ---------------------------------------------------------------------------

/// A named group of confounds to retain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Head motion parameters.
    Motion,
    /// Discrete cosine drift basis (high-pass filtering regressors).
    HighPass,
    /// Mean white-matter and CSF signals.
    WmCsf,
    /// Mean whole-brain signal.
    GlobalSignal,
    /// CompCor noise components (anatomical or temporal).
    CompCor,
    /// ICA-AROMA motion components.
    IcaAroma,
    /// Spike regressors for high-motion frames.
    Scrub,
}

impl FromStr for Strategy {
    type Err = ConfoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "motion" => Ok(Strategy::Motion),
            "high_pass" => Ok(Strategy::HighPass),
            "wm_csf" => Ok(Strategy::WmCsf),
            "global_signal" | "global" => Ok(Strategy::GlobalSignal),
            "compcor" => Ok(Strategy::CompCor),
            "ica_aroma" => Ok(Strategy::IcaAroma),
            "scrub" => Ok(Strategy::Scrub),
            other => Err(ConfoundError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Motion => "motion",
            Strategy::HighPass => "high_pass",
            Strategy::WmCsf => "wm_csf",
            Strategy::GlobalSignal => "global_signal",
            Strategy::CompCor => "compcor",
            Strategy::IcaAroma => "ica_aroma",
            Strategy::Scrub => "scrub",
        };
        f.write_str(name)
    }
}

/// Expansion degree applied to a group of base parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    /// Raw parameters only.
    Basic,
    /// Plus temporal derivatives.
    Derivatives,
    /// Plus squares.
    Power2,
    /// Plus derivatives, squares and squared derivatives.
    Full,
}

impl Model {
    fn suffixes(&self) -> &'static [&'static str] {
        match self {
            Model::Basic => &[],
            Model::Derivatives => &["derivative1"],
            Model::Power2 => &["power2"],
            Model::Full => &["derivative1", "power2", "derivative1_power2"],
        }
    }

    /// Expand base parameter names with the model's suffixes: all base
    /// names first, then the suffixed variants per parameter.
    pub fn expand(&self, params: &[&str]) -> Vec<String> {
        let mut full: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        for par in params {
            for suffix in self.suffixes() {
                full.push(format!("{par}_{suffix}"));
            }
        }
        full
    }
}

impl FromStr for Model {
    type Err = ConfoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Model::Basic),
            "derivatives" => Ok(Model::Derivatives),
            "power2" => Ok(Model::Power2),
            "full" => Ok(Model::Full),
            other => Err(ConfoundError::UnknownModel(other.to_string())),
        }
    }
}

/// How (and whether) to reduce the motion block with PCA.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionReduction {
    /// Keep the expanded motion parameters as-is.
    Off,
    /// Keep a fixed number of principal components.
    Components(usize),
    /// Keep the smallest number of components explaining this fraction of
    /// the variance.
    VarianceRatio(f64),
}

impl MotionReduction {
    /// Interpret a scalar knob: 0 disables reduction, a fraction below 1
    /// is a variance target, anything else a component count.
    pub fn from_f64(x: f64) -> Self {
        if x <= 0.0 {
            MotionReduction::Off
        } else if x < 1.0 {
            MotionReduction::VarianceRatio(x)
        } else {
            MotionReduction::Components(x as usize)
        }
    }
}

/// Which tissue mask the CompCor components were computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompCorKind {
    Anat,
    Temp,
}

impl CompCorKind {
    fn keyword(&self) -> &'static str {
        match self {
            CompCorKind::Anat => "a_comp_cor_",
            CompCorKind::Temp => "t_comp_cor_",
        }
    }
}

impl FromStr for CompCorKind {
    type Err = ConfoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anat" => Ok(CompCorKind::Anat),
            "temp" => Ok(CompCorKind::Temp),
            other => Err(ConfoundError::UnknownCompCor(other.to_string())),
        }
    }
}

/// Scrubbing flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrubMode {
    /// Threshold-based outlier frames only.
    Basic,
    /// Also censor retained segments shorter than five frames.
    Full,
}

impl FromStr for ScrubMode {
    type Err = ConfoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ScrubMode::Basic),
            "full" => Ok(ScrubMode::Full),
            other => Err(ConfoundError::UnknownScrub(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Confounds – the strategy specification and resolver
// ---------------------------------------------------------------------------

/// A confound-loading specification: which strategies to apply, in which
/// order, and their per-group parameters.
///
/// Resolve it against a table with [`Confounds::load`] (from a file path) or
/// [`Confounds::load_table`] (in memory).
#[derive(Debug, Clone)]
pub struct Confounds {
    /// Strategy groups, applied and concatenated in this order.
    pub strategy: Vec<Strategy>,
    /// Expansion model for the motion parameters.
    pub motion: Model,
    /// Optional PCA reduction of the motion block.
    pub n_motion: MotionReduction,
    /// Expansion model for the white-matter/CSF signals.
    pub wm_csf: Model,
    /// Expansion model for the global signal.
    pub global_signal: Model,
    /// CompCor flavour.
    pub compcor: CompCorKind,
    /// Number of CompCor components to keep (None = all available).
    pub n_compcor: Option<usize>,
    /// Scrubbing flavour.
    pub scrub: ScrubMode,
    /// Framewise-displacement threshold, in mm.
    pub fd_thresh: f64,
    /// Standardized DVARS threshold.
    pub std_dvars_thresh: f64,
    /// Standardize output columns to zero mean over time. Leave on when
    /// the downstream regression uses no or z-score standardization; turn
    /// off for percent-signal-change normalization.
    pub demean: bool,
}

impl Default for Confounds {
    fn default() -> Self {
        Confounds {
            strategy: vec![Strategy::Motion, Strategy::HighPass, Strategy::WmCsf],
            motion: Model::Full,
            n_motion: MotionReduction::Off,
            wm_csf: Model::Basic,
            global_signal: Model::Basic,
            compcor: CompCorKind::Anat,
            n_compcor: None,
            scrub: ScrubMode::Full,
            fd_thresh: 0.2,
            std_dvars_thresh: 3.0,
            demean: true,
        }
    }
}

/// The assembled result: the reduced table plus, when scrubbing is part of
/// the strategy, the indices of retained frames.
#[derive(Debug, Clone)]
pub struct ConfoundOutput {
    pub table: ConfoundTable,
    pub sample_mask: Option<Vec<usize>>,
}

impl Confounds {
    /// A specification with the given strategy groups and default
    /// parameters for each.
    pub fn new(strategy: Vec<Strategy>) -> Self {
        Confounds {
            strategy,
            ..Confounds::default()
        }
    }

    /// Parse a list of strategy names.
    pub fn from_names(names: &[String]) -> Result<Self, ConfoundError> {
        let strategy = names
            .iter()
            .map(|n| n.parse())
            .collect::<Result<Vec<Strategy>, _>>()?;
        Ok(Confounds::new(strategy))
    }

    /// Load and reduce confounds from a file path.
    ///
    /// Accepts either the confounds TSV itself or a preprocessed fMRI image
    /// path, in which case the companion TSV is discovered by name. The
    /// JSON sidecar is picked up automatically when present.
    pub fn load(&self, path: &Path) -> Result<ConfoundOutput, ConfoundError> {
        let tsv = loader::resolve_input(path)?;
        let table = loader::load_table(&tsv)?;
        let meta = loader::load_sidecar(&tsv)?;
        info!(
            "loaded {} confounds x {} time points from {}",
            table.n_cols(),
            table.n_rows(),
            tsv.display()
        );
        self.load_table(&table, meta.as_ref())
    }

    /// Resolve the strategy against an in-memory table.
    pub fn load_table(
        &self,
        table: &ConfoundTable,
        meta: Option<&ConfoundMetadata>,
    ) -> Result<ConfoundOutput, ConfoundError> {
        let mut groups = Vec::with_capacity(self.strategy.len());
        let mut sample_mask = None;

        for strat in &self.strategy {
            let group = match strat {
                Strategy::Motion => self.load_motion(table)?,
                Strategy::HighPass => keyword_group(table, HIGH_PASS_KEYWORD)?,
                Strategy::WmCsf => {
                    table.select(&self.wm_csf.expand(&["csf", "white_matter"]))?
                }
                Strategy::GlobalSignal => {
                    table.select(&self.global_signal.expand(&["global_signal"]))?
                }
                Strategy::CompCor => self.load_compcor(table, meta)?,
                Strategy::IcaAroma => keyword_group(table, AROMA_KEYWORD)?,
                Strategy::Scrub => {
                    let (spikes, mask) = scrub::spike_regressors(
                        table,
                        self.scrub,
                        self.fd_thresh,
                        self.std_dvars_thresh,
                    )?;
                    sample_mask = Some(mask);
                    spikes
                }
            };
            debug!("strategy {strat} resolved to {} columns", group.n_cols());
            groups.push(group);
        }

        let mut out = ConfoundTable::concat(groups, table.n_rows())?;
        out.repair_first_row();
        if self.demean {
            out.demean();
        }
        Ok(ConfoundOutput {
            table: out,
            sample_mask,
        })
    }

    fn load_motion(&self, table: &ConfoundTable) -> Result<ConfoundTable, ConfoundError> {
        let params = self.motion.expand(&MOTION_PARAMS);
        let mut block = table.select(&params)?;
        // PCA cannot digest the NaN that derivative columns carry at t=0.
        block.repair_first_row();
        match self.n_motion {
            MotionReduction::Off => Ok(block),
            _ => pca::motion_pca(&block, &self.n_motion),
        }
    }

    fn load_compcor(
        &self,
        table: &ConfoundTable,
        meta: Option<&ConfoundMetadata>,
    ) -> Result<ConfoundTable, ConfoundError> {
        let keyword = self.compcor.keyword();
        let mut names = table.columns_matching(keyword);
        if names.is_empty() {
            return Err(ConfoundError::MissingKeywords(vec![keyword.to_string()]));
        }
        // Component names are zero padded, so this is index order.
        names.sort();

        // Anatomical CompCor components come from WM, CSF and combined
        // masks; only the combined ones are wanted. Columns without sidecar
        // metadata are kept.
        if self.compcor == CompCorKind::Anat {
            if let Some(meta) = meta {
                names.retain(|name| {
                    meta.get(name)
                        .and_then(|info| info.mask.as_deref())
                        .map(|mask| mask == "combined")
                        .unwrap_or(true)
                });
                if names.is_empty() {
                    return Err(ConfoundError::MissingKeywords(vec![keyword.to_string()]));
                }
            }
        }

        if let Some(n) = self.n_compcor {
            names.truncate(n);
        }
        table.select(&names)
    }
}

fn keyword_group(table: &ConfoundTable, keyword: &str) -> Result<ConfoundTable, ConfoundError> {
    let names = table.columns_matching(keyword);
    if names.is_empty() {
        return Err(ConfoundError::MissingKeywords(vec![keyword.to_string()]));
    }
    table.select(&names)
}
