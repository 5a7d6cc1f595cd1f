use std::path::PathBuf;

use xrt_core::SimError;

use crate::site::ConfigError;

/// Everything that can end a tolerancing run.
///
/// None of these are retried: a sweep is a batch job and is simply rerun.
#[derive(Debug, thiserror::Error)]
pub enum ToleranceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimError),
    #[error("cannot flatten column `{column}`: {reason}")]
    DataShape { column: String, reason: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToleranceError {
    pub(crate) fn data_shape(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataShape {
            column: column.into(),
            reason: reason.into(),
        }
    }
}
