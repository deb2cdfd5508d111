//! ## Dataset I/O
//!
//! Helpers for reading raw churn exports and writing processed datasets.
//!
//! - [`session`] creates the DataFusion context used by the crate. It runs with a single target
//!   partition so collected rows come back in input order.
//! - [`load_dataset`] reads a CSV or Parquet file, chosen by extension.
//! - [`save_processed_dataset`] writes the feature columns plus an appended `target` column as CSV
//!   or Parquet, chosen by extension.

use crate::exceptions::{ChurnPipelineError, ChurnPipelineResult};
use crate::preprocess::ProcessedData;
use datafusion::dataframe::DataFrame;
use datafusion::prelude::{CsvReadOptions, ParquetReadOptions, SessionConfig, SessionContext};
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Csv,
    Parquet,
}

fn detect_format(path: &Path) -> ChurnPipelineResult<FileFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(FileFormat::Csv),
        Some(ext) if ext.eq_ignore_ascii_case("parquet") => Ok(FileFormat::Parquet),
        _ => Err(ChurnPipelineError::UnsupportedFormat(format!(
            "Unsupported file format for {}. Please provide a CSV or Parquet file.",
            path.display()
        ))),
    }
}

/// Creates a DataFusion execution context that preserves input row order.
pub fn session() -> SessionContext {
    SessionContext::new_with_config(SessionConfig::new().with_target_partitions(1))
}

/// Loads data from a given path and automatically detects the format (CSV or Parquet).
pub async fn load_dataset(
    ctx: &SessionContext,
    path: impl AsRef<Path>,
) -> ChurnPipelineResult<DataFrame> {
    let path = path.as_ref();
    let format = detect_format(path)?;
    if !path.exists() {
        return Err(ChurnPipelineError::NotFound(path.to_path_buf()));
    }
    let location = path.to_string_lossy().to_string();
    let df = match format {
        FileFormat::Csv => ctx.read_csv(location.as_str(), CsvReadOptions::new()).await?,
        FileFormat::Parquet => {
            ctx.read_parquet(location.as_str(), ParquetReadOptions::default())
                .await?
        }
    };
    info!("Loaded dataset from {}", path.display());
    Ok(df)
}

/// Persist processed features and target into a single CSV or Parquet file.
pub fn save_processed_dataset(
    processed: &ProcessedData,
    path: impl AsRef<Path>,
) -> ChurnPipelineResult<()> {
    let path = path.as_ref();
    let format = detect_format(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let batch = processed
        .features
        .to_record_batch(Some(&processed.target))?;
    let file = File::create(path)?;
    match format {
        FileFormat::Csv => {
            let mut writer = arrow::csv::Writer::new(file);
            writer.write(&batch)?;
        }
        FileFormat::Parquet => {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(&batch)?;
            writer.close()?;
        }
    }
    info!("Saved processed dataset to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format_by_extension() {
        assert_eq!(
            detect_format(Path::new("data/raw/churn.csv")).unwrap(),
            FileFormat::Csv
        );
        assert_eq!(
            detect_format(Path::new("data/raw/churn.PARQUET")).unwrap(),
            FileFormat::Parquet
        );
        assert!(matches!(
            detect_format(Path::new("data/raw/churn.xlsx")),
            Err(ChurnPipelineError::UnsupportedFormat(_))
        ));
    }
}
