//! ## Settings
//!
//! Environment-driven configuration for the preprocessing step.
//!
//! | Variable                     | Meaning                                              |
//! |------------------------------|------------------------------------------------------|
//! | `RAW_DATA_PATH`              | raw dataset (CSV or Parquet)                         |
//! | `PIPELINE_PATH`              | persisted pipeline artifact                          |
//! | `PROCESSED_DATA_PATH`        | processed dataset output (CSV or Parquet)            |
//! | `CHURN_TARGET_COLUMN`        | preferred target column                              |
//! | `CHURN_TARGET_CANDIDATES`    | comma-separated list replacing the default candidates |
//! | `CHURN_NUMERIC_FEATURES`     | comma-separated numeric columns (with the next one)  |
//! | `CHURN_CATEGORICAL_FEATURES` | comma-separated categorical columns                  |
//! | `CHURN_PIPELINE_MODE`        | `fit` (default) or `apply`                           |
//!
//! Overrides are parsed up front: an unparseable value fails before any file is read or written.

use crate::exceptions::{ChurnPipelineError, ChurnPipelineResult};
use crate::feature_types::FeatureTypes;
use crate::preprocess::Preprocessor;
use crate::target::TargetResolver;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_RAW_DATA_PATH: &str = "data/raw/telecom_churn.csv";
pub const DEFAULT_PIPELINE_PATH: &str = "models/preprocessing_pipeline.bin";
pub const DEFAULT_PROCESSED_DATA_PATH: &str = "data/processed/churn_processed.csv";

/// Whether the preprocessing step fits a new pipeline or reuses a persisted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    #[default]
    Fit,
    Apply,
}

impl FromStr for PipelineMode {
    type Err = ChurnPipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fit" => Ok(PipelineMode::Fit),
            "apply" => Ok(PipelineMode::Apply),
            other => Err(ChurnPipelineError::InvalidParameter(format!(
                "Unknown pipeline mode '{}', expected 'fit' or 'apply'",
                other
            ))),
        }
    }
}

/// Resolved configuration of the preprocessing step.
#[derive(Debug, Clone)]
pub struct Settings {
    pub raw_data_path: PathBuf,
    pub pipeline_path: PathBuf,
    pub processed_data_path: PathBuf,
    pub target_column: Option<String>,
    pub resolver: TargetResolver,
    pub feature_types: Option<FeatureTypes>,
    pub mode: PipelineMode,
}

fn parse_list(var: &str, value: &str) -> ChurnPipelineResult<Vec<String>> {
    let items: Vec<String> = value.split(',').map(|s| s.trim().to_string()).collect();
    if items.iter().any(|s| s.is_empty()) {
        return Err(ChurnPipelineError::InvalidParameter(format!(
            "{} contains an empty entry: '{}'",
            var, value
        )));
    }
    Ok(items)
}

impl Settings {
    /// Read the settings from the process environment.
    pub fn from_env() -> ChurnPipelineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ChurnPipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let path = |key: &str, default: &str| {
            PathBuf::from(get(key).unwrap_or_else(|| default.to_string()))
        };

        let resolver = match get("CHURN_TARGET_CANDIDATES") {
            Some(value) => {
                TargetResolver::new(parse_list("CHURN_TARGET_CANDIDATES", &value)?)?
            }
            None => TargetResolver::default(),
        };

        let feature_types = match (
            get("CHURN_NUMERIC_FEATURES"),
            get("CHURN_CATEGORICAL_FEATURES"),
        ) {
            (Some(numeric), Some(categorical)) => Some(FeatureTypes::new(
                parse_list("CHURN_NUMERIC_FEATURES", &numeric)?,
                parse_list("CHURN_CATEGORICAL_FEATURES", &categorical)?,
            )?),
            (None, None) => None,
            _ => {
                return Err(ChurnPipelineError::InvalidParameter(
                    "CHURN_NUMERIC_FEATURES and CHURN_CATEGORICAL_FEATURES must be set together"
                        .to_string(),
                ))
            }
        };

        let mode = match get("CHURN_PIPELINE_MODE") {
            Some(value) => value.parse()?,
            None => PipelineMode::default(),
        };

        Ok(Self {
            raw_data_path: path("RAW_DATA_PATH", DEFAULT_RAW_DATA_PATH),
            pipeline_path: path("PIPELINE_PATH", DEFAULT_PIPELINE_PATH),
            processed_data_path: path("PROCESSED_DATA_PATH", DEFAULT_PROCESSED_DATA_PATH),
            target_column: get("CHURN_TARGET_COLUMN").map(|v| v.trim().to_string()),
            resolver,
            feature_types,
            mode,
        })
    }

    /// The preprocessor described by these settings.
    pub fn preprocessor(&self) -> Preprocessor {
        let mut preprocessor = Preprocessor::new().with_resolver(self.resolver.clone());
        if let Some(target) = &self.target_column {
            preprocessor = preprocessor.with_target_hint(target.clone());
        }
        if let Some(types) = &self.feature_types {
            preprocessor = preprocessor.with_feature_types(types.clone());
        }
        preprocessor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_with(vars: &[(&str, &str)]) -> ChurnPipelineResult<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_with(&[]).unwrap();
        assert_eq!(settings.raw_data_path, PathBuf::from(DEFAULT_RAW_DATA_PATH));
        assert_eq!(settings.pipeline_path, PathBuf::from(DEFAULT_PIPELINE_PATH));
        assert_eq!(settings.resolver, TargetResolver::default());
        assert_eq!(settings.mode, PipelineMode::Fit);
        assert!(settings.target_column.is_none());
        assert!(settings.feature_types.is_none());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let settings = settings_with(&[
            ("PIPELINE_PATH", "/tmp/p.bin"),
            ("CHURN_TARGET_COLUMN", "Exited"),
            ("CHURN_TARGET_CANDIDATES", "Exited, churn_flag"),
            ("CHURN_NUMERIC_FEATURES", "tenure,MonthlyCharges"),
            ("CHURN_CATEGORICAL_FEATURES", "Contract"),
            ("CHURN_PIPELINE_MODE", "Apply"),
        ])
        .unwrap();
        assert_eq!(settings.pipeline_path, PathBuf::from("/tmp/p.bin"));
        assert_eq!(settings.target_column.as_deref(), Some("Exited"));
        assert_eq!(settings.resolver.candidates(), ["Exited", "churn_flag"]);
        let types = settings.feature_types.unwrap();
        assert_eq!(types.numeric(), ["tenure", "MonthlyCharges"]);
        assert_eq!(types.categorical(), ["Contract"]);
        assert_eq!(settings.mode, PipelineMode::Apply);
    }

    #[test]
    fn test_half_feature_split_is_rejected() {
        let err = settings_with(&[("CHURN_NUMERIC_FEATURES", "tenure")]).unwrap_err();
        assert!(matches!(err, ChurnPipelineError::InvalidParameter(_)));
    }

    #[test]
    fn test_unparseable_overrides_are_rejected() {
        assert!(settings_with(&[("CHURN_TARGET_CANDIDATES", "Churn,,churn")]).is_err());
        assert!(settings_with(&[("CHURN_PIPELINE_MODE", "retrain")]).is_err());
        assert!(settings_with(&[
            ("CHURN_NUMERIC_FEATURES", "tenure"),
            ("CHURN_CATEGORICAL_FEATURES", "tenure"),
        ])
        .is_err());
    }
}
