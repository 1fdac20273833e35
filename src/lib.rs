//! Support Vector Machine inference and model interchange
//!
//! Loads libsvm-compatible models, predicts classes, decision scores and
//! class probabilities from dense inputs, and stores models together with
//! their input normalization in structured container files.

pub mod codec;
pub mod core;
pub mod data;
pub mod kernel;
pub mod machine;
pub mod persistence;
pub mod solver;

// Re-export main types for convenience
pub use crate::core::error::{Result, SVMError};
pub use crate::core::types::*;
pub use crate::data::SvmFile;
pub use crate::machine::SupportVector;
pub use crate::persistence::{Attribute, Dataset, ModelFile, Record};
pub use crate::solver::{ModelHandle, ModelParts, PredictStrategy, SvmModel, SOLVER_VERSION};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
