//! Error types for SVM inference and model interchange

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SVMError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("cannot load SVM model from `{path}': {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("corrupt SVM model blob: {0}")]
    CorruptModel(String),

    #[error("null SVM model cannot be processed")]
    NullModel,

    #[error("Dimension mismatch on {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Layout error: {0}")]
    LayoutError(String),

    #[error("request for label of class {index} in SVM with {n_classes} classes is not legal")]
    ClassIndex { index: usize, n_classes: usize },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Container error: {0}")]
    ContainerError(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, SVMError>;
