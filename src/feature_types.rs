//! ## Feature Type Detection
//!
//! Splits the feature columns of a dataset into numeric and categorical sets by looking at the
//! Arrow type of every column. There are no value-based heuristics: a string column that happens to
//! hold digits stays categorical, and a low-cardinality integer column stays numeric.

use crate::exceptions::{ChurnPipelineError, ChurnPipelineResult};
use arrow::datatypes::DataType;
use datafusion::common::DFSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Returns true for Arrow types stored as numbers.
///
/// Booleans count as numeric, and so does the `Null` type of a column with no observed values.
pub fn is_numeric_kind(data_type: &DataType) -> bool {
    data_type.is_numeric() || matches!(data_type, DataType::Boolean | DataType::Null)
}

/// A disjoint partition of feature columns into numeric and categorical sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureTypes {
    numeric: Vec<String>,
    categorical: Vec<String>,
}

impl FeatureTypes {
    /// Create a feature split from explicit column lists.
    ///
    /// Fails when a name is blank, repeated, or present in both lists.
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> ChurnPipelineResult<Self> {
        let mut seen = HashSet::new();
        for name in numeric.iter().chain(categorical.iter()) {
            if name.trim().is_empty() {
                return Err(ChurnPipelineError::InvalidParameter(
                    "Feature column names must not be blank".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ChurnPipelineError::InvalidParameter(format!(
                    "Column '{}' is listed more than once in the feature split",
                    name
                )));
            }
        }
        Ok(Self {
            numeric,
            categorical,
        })
    }

    pub fn numeric(&self) -> &[String] {
        &self.numeric
    }

    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    /// All feature columns, numeric first.
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.numeric.iter().chain(self.categorical.iter())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns().any(|c| c == name)
    }
}

/// Classify every column except `target` in schema order.
pub fn detect_feature_types(schema: &DFSchema, target: &str) -> FeatureTypes {
    let mut numeric = Vec::new();
    let mut categorical = Vec::new();
    for field in schema.fields() {
        if field.name() == target {
            continue;
        }
        if is_numeric_kind(field.data_type()) {
            numeric.push(field.name().clone());
        } else {
            categorical.push(field.name().clone());
        }
    }
    FeatureTypes {
        numeric,
        categorical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema};

    #[test]
    fn test_detects_types_from_schema() {
        let schema = DFSchema::try_from(Schema::new(vec![
            Field::new("customerID", DataType::Utf8, false),
            Field::new("tenure", DataType::Int64, false),
            Field::new("SeniorCitizen", DataType::Boolean, true),
            Field::new("Contract", DataType::Utf8, true),
            Field::new("MonthlyCharges", DataType::Float64, true),
            Field::new("Notes", DataType::Null, true),
            Field::new("Churn", DataType::Utf8, true),
        ]))
        .unwrap();

        let types = detect_feature_types(&schema, "Churn");
        assert_eq!(
            types.numeric(),
            ["tenure", "SeniorCitizen", "MonthlyCharges", "Notes"]
        );
        assert_eq!(types.categorical(), ["customerID", "Contract"]);
        assert!(!types.contains("Churn"));
    }

    #[test]
    fn test_overlapping_split_is_rejected() {
        let err = FeatureTypes::new(
            vec!["tenure".to_string()],
            vec!["Contract".to_string(), "tenure".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, ChurnPipelineError::InvalidParameter(_)));
    }

    #[test]
    fn test_blank_name_is_rejected() {
        assert!(FeatureTypes::new(vec![" ".to_string()], vec![]).is_err());
    }
}
