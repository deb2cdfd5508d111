//! # Categorical Encoding
//!
//! **OneHotEncoder** expands each categorical column into one `Float64` indicator column per
//! category observed at fit time. The new column names are constructed by concatenating the original
//! column name, an underscore, and the category value. Categories are kept in sorted order, so the
//! output layout depends only on the set of categories and never on the row order of the fit data.
//!
//! Values that were not observed at fit time, and missing values, produce an all-zero indicator
//! block instead of an error.
//!
//! Indicator names are fixed at fit time and are unique within the output frame. When
//! `<column>_<category>` is already taken (by a column the encoder keeps, or by an earlier
//! indicator), the first free `<column>_<category>_<n>` is used instead.

use crate::exceptions::{ChurnPipelineError, ChurnPipelineResult};
use crate::impl_transformer;
use crate::transformers::imputation::{as_text, validate_columns};
use arrow::array::{Array, StringArray};
use arrow::datatypes::DataType;
use datafusion::logical_expr::{col, ident, lit, Expr};
use datafusion::prelude::*;
use datafusion_expr::expr::Case;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Extract the sorted distinct non-null values of a column, read as text.
async fn extract_distinct_values(
    df: &DataFrame,
    col_name: &str,
) -> ChurnPipelineResult<Vec<String>> {
    let distinct_df = df
        .clone()
        .select(vec![as_text(col_name).alias("value")])?
        .filter(col("value").is_not_null())?
        .distinct()?;
    let batches = distinct_df
        .collect()
        .await
        .map_err(ChurnPipelineError::from)?;
    let mut values = BTreeSet::new();
    for batch in batches {
        let array = arrow::compute::cast(batch.column(0), &DataType::Utf8)?;
        let array = array
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                ChurnPipelineError::InvalidParameter(format!(
                    "Expected Utf8 array for column {}",
                    col_name
                ))
            })?;
        for i in 0..array.len() {
            if !array.is_null(i) {
                values.insert(array.value(i).to_string());
            }
        }
    }
    Ok(values.into_iter().collect())
}

/// Name of the indicator column for `category` of `column`.
pub fn indicator_name(column: &str, category: &str) -> String {
    format!("{}_{}", column, category)
}

/// Returns `base` if it is not in `taken`, otherwise the first free `<base>_<n>`.
pub(crate) fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Transforms each categorical column into one binary column per known category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub columns: Vec<String>,
    /// Mapping from column name to its sorted list of categories.
    pub categories: HashMap<String, Vec<String>>,
    /// Mapping from column name to the output name of each category, parallel to `categories`.
    pub indicator_names: HashMap<String, Vec<String>>,
    fitted: bool,
}

impl OneHotEncoder {
    /// Create a new OneHotEncoder for the specified columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            categories: HashMap::new(),
            indicator_names: HashMap::new(),
            fitted: false,
        }
    }

    /// Learn the distinct category values of each target column, and the output name of every
    /// indicator. Names of the columns the encoder keeps are never reused.
    pub async fn fit(&mut self, df: &DataFrame) -> ChurnPipelineResult<()> {
        validate_columns(df, &self.columns)?;
        let categories = try_join_all(
            self.columns
                .iter()
                .map(|col_name| extract_distinct_values(df, col_name)),
        )
        .await?;

        let mut taken: HashSet<String> = df
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .filter(|name| !self.columns.contains(name))
            .collect();
        let mut indicator_names = HashMap::new();
        for (col_name, cats) in self.columns.iter().zip(categories.iter()) {
            let names: Vec<String> = cats
                .iter()
                .map(|cat| {
                    let name = unique_name(&indicator_name(col_name, cat), &taken);
                    taken.insert(name.clone());
                    name
                })
                .collect();
            indicator_names.insert(col_name.clone(), names);
        }

        self.categories = self.columns.iter().cloned().zip(categories).collect();
        self.indicator_names = indicator_names;
        self.fitted = true;
        Ok(())
    }

    /// Indicator column names, one block per target column in column order.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|col_name| self.indicator_names.get(col_name).into_iter().flatten())
            .cloned()
            .collect()
    }

    fn indicator_exprs(&self, col_name: &str) -> Vec<Expr> {
        let (Some(cats), Some(names)) = (
            self.categories.get(col_name),
            self.indicator_names.get(col_name),
        ) else {
            return vec![];
        };
        cats.iter()
            .zip(names)
            .map(|(cat, name)| {
                Expr::Case(Case {
                    expr: None,
                    when_then_expr: vec![(
                        Box::new(as_text(col_name).eq(lit(cat.clone()))),
                        Box::new(lit(1.0_f64)),
                    )],
                    else_expr: Some(Box::new(lit(0.0_f64))),
                })
                .alias(name)
            })
            .collect()
    }

    /// Transform the DataFrame by replacing each target column with its indicator columns.
    /// Other columns are retained in place.
    pub fn transform(&self, df: DataFrame) -> ChurnPipelineResult<DataFrame> {
        if !self.fitted {
            return Err(ChurnPipelineError::FitNotCalled);
        }
        validate_columns(&df, &self.columns)?;
        let outputs: HashSet<String> = self.feature_names().into_iter().collect();
        let mut exprs = vec![];
        for field in df.schema().fields() {
            let name = field.name();
            if self.columns.contains(name) {
                exprs.extend(self.indicator_exprs(name));
            } else if outputs.contains(name) {
                return Err(ChurnPipelineError::InvalidParameter(format!(
                    "Column '{}' clashes with an indicator column learned at fit time",
                    name
                )));
            } else {
                exprs.push(ident(name));
            }
        }
        df.select(exprs).map_err(ChurnPipelineError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(OneHotEncoder);
