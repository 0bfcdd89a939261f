pub mod cli;
pub mod confounds;

pub use confounds::error::ConfoundError;
pub use confounds::model::{ComponentInfo, ConfoundMetadata, ConfoundTable};
pub use confounds::select::{
    CompCorKind, ConfoundOutput, Confounds, Model, MotionReduction, ScrubMode, Strategy,
};
