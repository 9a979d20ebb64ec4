use std::path::PathBuf;

use thiserror::Error;

/// Root causes raised by the loaders.
///
/// Loaders return `anyhow::Result`, so these arrive wrapped in context;
/// recover them with `err.downcast_ref::<LoadError>()`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("key '{key}' not found in {}", .path.display())]
    MissingKey { key: String, path: PathBuf },

    #[error("group '{group}' not found in {}", .path.display())]
    MissingGroup { group: String, path: PathBuf },

    #[error("dataset '{key}' has unsupported type {dtype}")]
    UnsupportedType { key: String, dtype: String },

    #[error("dataset '{key}' holds {dtype}, expected text")]
    NotText { key: String, dtype: String },

    #[error("dataset '{key}' holds {dtype}, expected a number")]
    NotNumeric { key: String, dtype: String },

    #[error("dataset '{key}' has shape {shape:?}, expected a scalar")]
    NotScalar { key: String, shape: Vec<usize> },

    #[error("cannot parse timestamp '{0}'")]
    InvalidTimestamp(String),
}
