//! Data loading
//!
//! Readers for sample files fed to the inference engine.

pub mod svmfile;

pub use self::svmfile::*;
