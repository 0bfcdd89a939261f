use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crate::confounds::select::{Confounds, MotionReduction};
use crate::confounds::writer::write_table;

#[derive(Parser)]
#[command(name = "fmriprep-confounds")]
#[command(about = "Select and reduce fMRIprep confound regressors", long_about = None)]
pub struct Cli {
    /// Confounds TSV, or a preprocessed fMRI image whose companion TSV is
    /// discovered by name
    pub input: PathBuf,

    /// Output TSV for the reduced confounds
    #[arg(short, long)]
    pub output: PathBuf,

    /// Start from a preset: params2, params6, params9, params24, params36,
    /// anat_compcor, temp_compcor
    #[arg(long, conflicts_with = "strategy")]
    pub preset: Option<String>,

    /// Comma-separated strategies: motion, high_pass, wm_csf,
    /// global_signal, compcor, ica_aroma, scrub
    #[arg(long, value_delimiter = ',')]
    pub strategy: Option<Vec<String>>,

    /// Motion expansion: basic, derivatives, power2, full
    #[arg(long, default_value = "full")]
    pub motion_model: String,

    /// WM/CSF expansion: basic, derivatives, power2, full
    #[arg(long, default_value = "basic")]
    pub wm_csf_model: String,

    /// Global signal expansion: basic, derivatives, power2, full
    #[arg(long, default_value = "basic")]
    pub global_model: String,

    /// PCA reduction of the motion block: 0 = off, a fraction below 1 is a
    /// variance target, an integer is a component count
    #[arg(long, default_value_t = 0.0)]
    pub n_motion: f64,

    /// CompCor flavour: anat or temp
    #[arg(long, default_value = "anat")]
    pub compcor: String,

    /// Number of CompCor components to keep (default: all available)
    #[arg(long)]
    pub n_compcor: Option<usize>,

    /// Scrub mode: basic or full (also censor segments under 5 frames)
    #[arg(long, default_value = "full")]
    pub scrub: String,

    /// Framewise-displacement threshold in mm for scrubbing
    #[arg(long, default_value_t = 0.2)]
    pub fd_thresh: f64,

    /// Standardized DVARS threshold for scrubbing
    #[arg(long, default_value_t = 3.0)]
    pub dvars_thresh: f64,

    /// Do not demean the output columns
    #[arg(long)]
    pub no_demean: bool,

    /// Drop scrubbed frames from the output instead of keeping spike
    /// regressors over the full length
    #[arg(long)]
    pub drop_scrubbed: bool,
}

impl Cli {
    /// Translate the arguments into a [`Confounds`] specification.
    pub fn build_confounds(&self) -> Result<Confounds> {
        let mut conf = match (&self.preset, &self.strategy) {
            (Some(preset), _) => preset_by_name(preset, self.n_compcor)?,
            (None, Some(names)) => Confounds::from_names(names)?,
            (None, None) => Confounds::default(),
        };

        // Presets fix their strategy list; the per-group knobs still apply.
        if self.preset.is_none() {
            conf.motion = self.motion_model.parse()?;
            conf.wm_csf = self.wm_csf_model.parse()?;
            conf.global_signal = self.global_model.parse()?;
            conf.compcor = self.compcor.parse()?;
            conf.n_compcor = self.n_compcor;
        }
        conf.n_motion = MotionReduction::from_f64(self.n_motion);
        conf.scrub = self.scrub.parse()?;
        conf.fd_thresh = self.fd_thresh;
        conf.std_dvars_thresh = self.dvars_thresh;
        conf.demean = !self.no_demean;
        Ok(conf)
    }
}

fn preset_by_name(name: &str, n_compcor: Option<usize>) -> Result<Confounds> {
    let conf = match name {
        "params2" => Confounds::params_2(),
        "params6" => Confounds::params_6(),
        "params9" => Confounds::params_9(),
        "params24" => Confounds::params_24(),
        "params36" => Confounds::params_36(),
        "anat_compcor" => Confounds::anat_compcor(n_compcor.unwrap_or(10)),
        "temp_compcor" => Confounds::temp_compcor(n_compcor.unwrap_or(6)),
        other => anyhow::bail!(
            "unknown preset '{other}' (expected params2, params6, params9, \
             params24, params36, anat_compcor or temp_compcor)"
        ),
    };
    Ok(conf)
}

/// Load, reduce and write the confounds.
pub fn run(cli: Cli) -> Result<()> {
    let conf = cli.build_confounds()?;
    let output = conf
        .load(&cli.input)
        .with_context(|| format!("loading confounds from {}", cli.input.display()))?;

    if let Some(mask) = &output.sample_mask {
        info!(
            "scrubbing flags {} of {} frames",
            output.table.n_rows() - mask.len(),
            output.table.n_rows()
        );
    }

    let mask = if cli.drop_scrubbed {
        output.sample_mask.as_deref()
    } else {
        None
    };
    write_table(&cli.output, &output.table, mask)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    Ok(())
}
