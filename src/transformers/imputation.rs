//! ## Transformers for imputing missing values
//!
//! This module provides the two imputers used by the preprocessing pipeline.
//!
//! - **MedianImputer**: Imputes numeric columns with the median of the observed values.
//! - **MostFrequentImputer**: Imputes categorical columns with the most frequent observed value.
//!
//! Both imputers normalize the column type while imputing: numeric columns come out as `Float64`
//! and categorical columns as `Utf8`, so every later step sees one physical type per branch.
//! Errors are returned as `ChurnPipelineError` and results are wrapped in `ChurnPipelineResult`.

use crate::exceptions::{ChurnPipelineError, ChurnPipelineResult};
use crate::impl_transformer;
use arrow::array::{Array, StringArray};
use arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::{count, median};
use datafusion::logical_expr::{cast, col, ident, lit, not, Case as DFCase, Expr};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Validates that every column in `target_cols` exists in the DataFrame.
/// Returns an error if any target column is missing.
pub(crate) fn validate_columns(df: &DataFrame, target_cols: &[String]) -> ChurnPipelineResult<()> {
    let schema = df.schema();
    for col_name in target_cols {
        if schema.field_with_name(None, col_name).is_err() {
            return Err(ChurnPipelineError::MissingColumn(format!(
                "Column '{}' not found in DataFrame",
                col_name
            )));
        }
    }
    Ok(())
}

/// Constructs an expression equivalent to SQL COALESCE(value, fallback) as a CASE expression.
fn coalesce_expr_for(value: Expr, fallback: Expr) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(Box::new(not(value.clone().is_null())), Box::new(value))],
        else_expr: Some(Box::new(fallback)),
    })
}

/// Rebuilds the projection of `df`, replacing every column in `target_cols` with the expression
/// returned by `replace`. All other columns are retained in place.
pub(crate) fn replace_columns<F>(
    df: DataFrame,
    target_cols: &[String],
    replace: F,
) -> ChurnPipelineResult<DataFrame>
where
    F: Fn(&str) -> Expr,
{
    let exprs: Vec<Expr> = df
        .schema()
        .fields()
        .iter()
        .map(|field| {
            let name = field.name();
            if target_cols.contains(name) {
                replace(name).alias(name)
            } else {
                ident(name)
            }
        })
        .collect();
    df.select(exprs).map_err(ChurnPipelineError::from)
}

/// Runs a single-row aggregate and returns its first value.
pub(crate) async fn aggregate_scalar(
    df: &DataFrame,
    aggregate: Expr,
) -> ChurnPipelineResult<ScalarValue> {
    let agg_df = df
        .clone()
        .aggregate(vec![], vec![aggregate])
        .map_err(ChurnPipelineError::from)?;
    let batches = agg_df.collect().await.map_err(ChurnPipelineError::from)?;
    match batches.iter().find(|b| b.num_rows() > 0) {
        Some(batch) => {
            ScalarValue::try_from_array(batch.column(0), 0).map_err(ChurnPipelineError::from)
        }
        None => Ok(ScalarValue::Null),
    }
}

/// Numeric view of a column.
pub(crate) fn as_float(name: &str) -> Expr {
    cast(ident(name), DataType::Float64)
}

/// Text view of a column.
pub(crate) fn as_text(name: &str) -> Expr {
    cast(ident(name), DataType::Utf8)
}

/// Replaces missing values with the median of the observed values in numeric columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedianImputer {
    pub columns: Vec<String>,
    pub impute_values: HashMap<String, f64>,
    fitted: bool,
}

impl MedianImputer {
    /// Value used for a column that had no observed values at fit time.
    pub const EMPTY_COLUMN_FILL: f64 = 0.0;

    /// Create a new imputer for the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            impute_values: HashMap::new(),
            fitted: false,
        }
    }

    /// For each target column, compute the median via an aggregate query.
    pub async fn fit(&mut self, df: &DataFrame) -> ChurnPipelineResult<()> {
        validate_columns(df, &self.columns)?;
        let medians = try_join_all(self.columns.iter().map(|col_name| async move {
            let scalar =
                aggregate_scalar(df, median(as_float(col_name)).alias("median")).await?;
            match scalar {
                ScalarValue::Float64(value) => Ok(value.unwrap_or(Self::EMPTY_COLUMN_FILL)),
                ScalarValue::Null => Ok(Self::EMPTY_COLUMN_FILL),
                other => Err(ChurnPipelineError::InvalidParameter(format!(
                    "Failed to compute median for column {}: got {:?}",
                    col_name, other
                ))),
            }
        }))
        .await?;
        self.impute_values = self.columns.iter().cloned().zip(medians).collect();
        self.fitted = true;
        Ok(())
    }

    /// Returns a new DataFrame where each target column is cast to `Float64` and missing values
    /// are replaced with the learned median.
    pub fn transform(&self, df: DataFrame) -> ChurnPipelineResult<DataFrame> {
        if !self.fitted {
            return Err(ChurnPipelineError::FitNotCalled);
        }
        validate_columns(&df, &self.columns)?;
        replace_columns(df, &self.columns, |name| {
            let fill = self
                .impute_values
                .get(name)
                .copied()
                .unwrap_or(Self::EMPTY_COLUMN_FILL);
            coalesce_expr_for(as_float(name), lit(fill))
        })
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(MedianImputer);

/// Replaces missing values with the most frequent observed value in categorical columns.
///
/// Ties are broken in favor of the smallest value, so the learned mode does not depend on the
/// row order of the fit data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MostFrequentImputer {
    pub columns: Vec<String>,
    /// `None` when the column had no observed values at fit time.
    pub impute_values: HashMap<String, Option<String>>,
    fitted: bool,
}

impl MostFrequentImputer {
    /// Create a new imputer for the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            impute_values: HashMap::new(),
            fitted: false,
        }
    }

    async fn compute_mode(df: &DataFrame, col_name: &str) -> ChurnPipelineResult<Option<String>> {
        let grouped = df
            .clone()
            .select(vec![as_text(col_name).alias("value")])?
            .filter(col("value").is_not_null())?
            .aggregate(vec![col("value")], vec![count(lit(1)).alias("cnt")])?
            .sort(vec![
                col("cnt").sort(false, false),
                col("value").sort(true, false),
            ])?
            .limit(0, Some(1))?;
        let batches = grouped.collect().await.map_err(ChurnPipelineError::from)?;
        for batch in batches.iter().filter(|b| b.num_rows() > 0) {
            let values = arrow::compute::cast(batch.column(0), &DataType::Utf8)?;
            let values = values
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| {
                    ChurnPipelineError::InvalidParameter(format!(
                        "Expected Utf8 array for column {}",
                        col_name
                    ))
                })?;
            if !values.is_null(0) {
                return Ok(Some(values.value(0).to_string()));
            }
        }
        Ok(None)
    }

    /// For each target column, compute the mode via grouping and counting.
    pub async fn fit(&mut self, df: &DataFrame) -> ChurnPipelineResult<()> {
        validate_columns(df, &self.columns)?;
        let modes = try_join_all(
            self.columns
                .iter()
                .map(|col_name| Self::compute_mode(df, col_name)),
        )
        .await?;
        self.impute_values = self.columns.iter().cloned().zip(modes).collect();
        self.fitted = true;
        Ok(())
    }

    /// Returns a new DataFrame where each target column is cast to `Utf8` and missing values are
    /// replaced with the learned mode.
    pub fn transform(&self, df: DataFrame) -> ChurnPipelineResult<DataFrame> {
        if !self.fitted {
            return Err(ChurnPipelineError::FitNotCalled);
        }
        validate_columns(&df, &self.columns)?;
        replace_columns(df, &self.columns, |name| {
            match self.impute_values.get(name).cloned().flatten() {
                Some(mode) => coalesce_expr_for(as_text(name), lit(mode)),
                None => as_text(name),
            }
        })
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(MostFrequentImputer);
