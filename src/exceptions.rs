//! ## Custom Errors for the Churn Pipeline
//!
//! This module defines the error type shared by every component of the churn preprocessing core.
//! It uses the `thiserror` crate to derive the `Error` trait.
//! The `ChurnPipelineError` enum covers wrapped errors from the underlying libraries (I/O, DataFusion,
//! Arrow, Parquet, and bincode) as well as the domain failures of target resolution, pipeline
//! application, and pipeline persistence.
//!
//! None of these errors are retried inside the crate. They propagate to the training or serving
//! driver, which owns the retry and alerting policy.
//!
//! ### Example
//!
//! ```rust
//! use churn_pipeline::exceptions::{ChurnPipelineError, ChurnPipelineResult};
//!
//! fn check_mode(mode: &str) -> ChurnPipelineResult<()> {
//!     Err(ChurnPipelineError::InvalidParameter(format!("unknown mode '{}'", mode)))
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Errors specific to the churn preprocessing core.
#[derive(Debug, Error)]
pub enum ChurnPipelineError {
    /// Wraps underlying I/O errors.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Wraps errors from Parquet.
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// Wraps (de)serialization errors of a persisted pipeline.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),

    /// No column of the dataset could be resolved as the churn target.
    #[error(
        "No recognizable target column found. Checked candidates {candidates:?}. Available columns: {available}"
    )]
    SchemaError {
        /// Full search order that was tried.
        candidates: Vec<String>,
        /// Truncated, comma-separated preview of the dataset columns.
        available: String,
    },

    /// A fitted pipeline was applied to data that lacks columns it was fit on.
    #[error("Schema mismatch: pipeline was fit on columns missing from the input: {missing:?}")]
    SchemaMismatch { missing: Vec<String> },

    /// A persisted artifact does not exist.
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A persisted artifact was written by an incompatible pipeline format.
    #[error("Incompatible pipeline artifact: {0}")]
    IncompatibleArtifact(String),

    /// Indicates that an invalid parameter was provided (e.g., an unparseable override).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates that the provided data format is unsupported (e.g., unknown file format).
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Indicates that the specified column does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Indicates the transform method was called before calling fit for a stateful transformer.
    #[error("Transform called before fit for stateful transformer")]
    FitNotCalled,
}

/// A convenient result type for churn pipeline operations.
pub type ChurnPipelineResult<T> = std::result::Result<T, ChurnPipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error() {
        let io_err = io::Error::new(io::ErrorKind::Other, "test io error");
        let err: ChurnPipelineError = io_err.into();
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("I/O error:"));
        assert!(err_msg.contains("test io error"));
    }

    #[test]
    fn test_datafusion_error() {
        let df_err = datafusion::error::DataFusionError::Plan("test plan error".into());
        let err: ChurnPipelineError = df_err.into();
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("DataFusion error:"));
        assert!(err_msg.contains("test plan error"));
    }

    #[test]
    fn test_parquet_error() {
        let parquet_err = parquet::errors::ParquetError::General("test parquet error".into());
        let err: ChurnPipelineError = parquet_err.into();
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("Parquet error:"));
        assert!(err_msg.contains("test parquet error"));
    }

    #[test]
    fn test_schema_error_lists_candidates_and_columns() {
        let err = ChurnPipelineError::SchemaError {
            candidates: vec!["Churn".to_string(), "Churn Label".to_string()],
            available: "customerID, tenure".to_string(),
        };
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("No recognizable target column"));
        assert!(err_msg.contains("\"Churn Label\""));
        assert!(err_msg.contains("customerID, tenure"));
    }

    #[test]
    fn test_schema_mismatch_names_missing_columns() {
        let err = ChurnPipelineError::SchemaMismatch {
            missing: vec!["tenure".to_string()],
        };
        assert!(format!("{}", err).contains("\"tenure\""));
    }

    #[test]
    fn test_not_found_error() {
        let err = ChurnPipelineError::NotFound(PathBuf::from("models/missing.bin"));
        assert_eq!(format!("{}", err), "Not found: models/missing.bin");
    }

    #[test]
    fn test_fit_not_called_error() {
        let err = ChurnPipelineError::FitNotCalled;
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("Transform called before fit for stateful transformer"));
    }
}
