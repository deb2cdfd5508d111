//! ## Target Resolution
//!
//! This module decides which column of an arbitrary churn export holds the label, and which other
//! columns are label synonyms that would leak the answer into the features.
//!
//! - **TargetResolver**: an ordered, configurable list of known target-column names. Resolution
//!   tries an optional preferred name first and then every candidate in order.
//! - **TargetResolution**: the resolved target plus the leakage set (every other candidate present
//!   in the dataset). The leakage set is dropped on every fit and every apply.
//! - **canonicalize_target**: maps a raw label column to `0`/`1` integers.

use crate::exceptions::{ChurnPipelineError, ChurnPipelineResult};
use crate::feature_types::is_numeric_kind;
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use datafusion::common::DFSchema;
use datafusion::prelude::DataFrame;
use tracing::{debug, info};

/// Target-column names seen across churn dataset vendors, in resolution order.
pub const DEFAULT_TARGET_CANDIDATES: [&str; 6] = [
    "Churn",
    "Churn Label",
    "churn",
    "churn_label",
    "Churn_Label",
    "Churn Value",
];

/// Number of dataset columns shown in a resolution error.
const COLUMN_PREVIEW_LIMIT: usize = 20;

/// Resolves the label column of a dataset from an ordered list of candidate names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResolver {
    candidates: Vec<String>,
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_TARGET_CANDIDATES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl TargetResolver {
    /// Create a resolver with a custom candidate list. The list must not be empty.
    pub fn new(candidates: Vec<String>) -> ChurnPipelineResult<Self> {
        if candidates.is_empty() {
            return Err(ChurnPipelineError::InvalidParameter(
                "Target candidate list must contain at least one name".to_string(),
            ));
        }
        if let Some(blank) = candidates.iter().find(|c| c.trim().is_empty()) {
            return Err(ChurnPipelineError::InvalidParameter(format!(
                "Target candidate names must not be blank, got '{}'",
                blank
            )));
        }
        Ok(Self { candidates })
    }

    /// The configured candidate names, in resolution order.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Resolve the target column and the leakage set for the given schema.
    ///
    /// The preferred name, when supplied, is tried before the candidate list. The first name
    /// present in the schema wins.
    pub fn resolve(
        &self,
        schema: &DFSchema,
        preferred: Option<&str>,
    ) -> ChurnPipelineResult<TargetResolution> {
        let columns: Vec<&str> = schema
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .collect();

        let search_order = preferred
            .into_iter()
            .chain(self.candidates.iter().map(String::as_str));

        let mut target = None;
        for candidate in search_order {
            if columns.contains(&candidate) {
                target = Some(candidate.to_string());
                break;
            }
        }

        let target = target.ok_or_else(|| ChurnPipelineError::SchemaError {
            candidates: self.candidates.clone(),
            available: columns
                .iter()
                .take(COLUMN_PREVIEW_LIMIT)
                .copied()
                .collect::<Vec<_>>()
                .join(", "),
        })?;
        debug!("Resolved target column to '{}'", target);

        let mut leakage: Vec<String> = Vec::new();
        for candidate in &self.candidates {
            if candidate != &target
                && columns.contains(&candidate.as_str())
                && !leakage.contains(candidate)
            {
                leakage.push(candidate.clone());
            }
        }

        Ok(TargetResolution { target, leakage })
    }
}

/// The outcome of target resolution for one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResolution {
    /// Column holding the churn label.
    pub target: String,
    /// Other label-like columns present in the dataset.
    pub leakage: Vec<String>,
}

impl TargetResolution {
    /// Returns the DataFrame without the leakage columns.
    pub fn drop_leakage(&self, df: DataFrame) -> ChurnPipelineResult<DataFrame> {
        if self.leakage.is_empty() {
            return Ok(df);
        }
        info!(
            "Dropping potential leakage columns: target='{}', duplicates={:?}",
            self.target, self.leakage
        );
        let names: Vec<&str> = self.leakage.iter().map(String::as_str).collect();
        df.drop_columns(&names)
            .map_err(ChurnPipelineError::from)
    }
}

/// Rejects fractional numeric labels, which an integer cast would silently truncate.
fn check_integral_labels(array: &ArrayRef) -> ChurnPipelineResult<()> {
    let data_type = array.data_type();
    if !(data_type.is_floating()
        || matches!(data_type, DataType::Decimal128(_, _) | DataType::Decimal256(_, _)))
    {
        return Ok(());
    }
    let casted = cast(array, &DataType::Float64)?;
    let values = casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| {
            ChurnPipelineError::InvalidParameter(
                "Expected Float64 array after casting target".to_string(),
            )
        })?;
    match values.iter().flatten().find(|v| !v.is_finite() || v.fract() != 0.0) {
        Some(bad) => Err(ChurnPipelineError::InvalidParameter(format!(
            "Numeric target labels must be whole numbers, got {}",
            bad
        ))),
        None => Ok(()),
    }
}

/// Converts a raw label column to binary integers.
///
/// Text labels are trimmed and lowercased; `"yes"` maps to 1 and everything else, missing values
/// included, maps to 0. Numeric and boolean labels are cast to integers as they are, with missing
/// values mapped to 0. A fractional or non-finite numeric label fails with
/// [`ChurnPipelineError::InvalidParameter`].
pub fn canonicalize_target(array: &ArrayRef) -> ChurnPipelineResult<Vec<i64>> {
    if is_numeric_kind(array.data_type()) {
        check_integral_labels(array)?;
        let casted = cast(array, &DataType::Int64)?;
        let ints = casted
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| {
                ChurnPipelineError::InvalidParameter(
                    "Expected Int64 array after casting target".to_string(),
                )
            })?;
        return Ok(ints.iter().map(|v| v.unwrap_or(0)).collect());
    }

    let casted = cast(array, &DataType::Utf8)?;
    let text = casted
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| {
            ChurnPipelineError::InvalidParameter(
                "Expected Utf8 array after casting target".to_string(),
            )
        })?;
    Ok(text
        .iter()
        .map(|value| match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("yes") => 1,
            _ => 0,
        })
        .collect())
}
