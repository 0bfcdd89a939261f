//! Predefined denoising strategies, following the benchmark models of
//! Ciric et al. 2017 (NeuroImage 154:174-187).

use super::select::{CompCorKind, Confounds, Model, MotionReduction, Strategy};

impl Confounds {
    /// The 2P strategy: mean white-matter and CSF signals with a high-pass
    /// cosine basis.
    pub fn params_2() -> Self {
        Confounds {
            strategy: vec![Strategy::HighPass, Strategy::WmCsf],
            wm_csf: Model::Basic,
            ..Confounds::default()
        }
    }

    /// The 6P strategy: the six basic motion parameters with high-pass.
    pub fn params_6() -> Self {
        Confounds {
            strategy: vec![Strategy::HighPass, Strategy::Motion],
            motion: Model::Basic,
            n_motion: MotionReduction::Off,
            ..Confounds::default()
        }
    }

    /// The 9P strategy: basic motion, WM/CSF, global signal and high-pass.
    pub fn params_9() -> Self {
        Confounds {
            strategy: vec![
                Strategy::HighPass,
                Strategy::Motion,
                Strategy::WmCsf,
                Strategy::GlobalSignal,
            ],
            motion: Model::Basic,
            n_motion: MotionReduction::Off,
            wm_csf: Model::Basic,
            global_signal: Model::Basic,
            ..Confounds::default()
        }
    }

    /// The 24P strategy: fully expanded motion parameters (derivatives,
    /// squares and squared derivatives) with high-pass.
    pub fn params_24() -> Self {
        Confounds {
            strategy: vec![Strategy::HighPass, Strategy::Motion],
            motion: Model::Full,
            n_motion: MotionReduction::Off,
            ..Confounds::default()
        }
    }

    /// The 36P strategy: motion, WM/CSF and global signal, all fully
    /// expanded, with high-pass.
    pub fn params_36() -> Self {
        Confounds {
            strategy: vec![
                Strategy::HighPass,
                Strategy::Motion,
                Strategy::WmCsf,
                Strategy::GlobalSignal,
            ],
            motion: Model::Full,
            n_motion: MotionReduction::Off,
            wm_csf: Model::Full,
            global_signal: Model::Full,
            ..Confounds::default()
        }
    }

    /// The aCompCor strategy: fully expanded motion, high-pass, and
    /// `n_compcor` anatomical CompCor components.
    pub fn anat_compcor(n_compcor: usize) -> Self {
        Confounds {
            strategy: vec![Strategy::HighPass, Strategy::Motion, Strategy::CompCor],
            motion: Model::Full,
            n_motion: MotionReduction::Off,
            compcor: CompCorKind::Anat,
            n_compcor: Some(n_compcor),
            ..Confounds::default()
        }
    }

    /// The tCompCor strategy: high-pass and `n_compcor` temporal CompCor
    /// components.
    pub fn temp_compcor(n_compcor: usize) -> Self {
        Confounds {
            strategy: vec![Strategy::HighPass, Strategy::CompCor],
            compcor: CompCorKind::Temp,
            n_compcor: Some(n_compcor),
            ..Confounds::default()
        }
    }
}
