//! Confound layer: table model, loading, strategy resolution, reduction.
//!
//! Pipeline:
//! ```text
//!  confounds .tsv (+ .json sidecar)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → ConfoundTable (+ ConfoundMetadata)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  select   │  resolve strategies → columns, expand by model
//!   └──────────┘
//!        │              │
//!        │              ├── pca    (motion block reduction)
//!        │              └── scrub  (spike regressors, sample mask)
//!        ▼
//!   ┌──────────┐
//!   │  writer   │  reduced table → .tsv
//!   └──────────┘
//! ```

pub mod error;
pub mod loader;
pub mod model;
pub mod pca;
pub mod presets;
pub mod scrub;
pub mod select;
pub mod writer;
