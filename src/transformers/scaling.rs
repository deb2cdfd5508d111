//! ## Standardization
//!
//! **StandardScaler** centers numeric columns on their mean and divides by the population standard
//! deviation learned at fit time. Columns with zero (or undefined) deviation keep a scale of 1.0, so
//! they are only centered.

use crate::exceptions::{ChurnPipelineError, ChurnPipelineResult};
use crate::impl_transformer;
use crate::transformers::imputation::{aggregate_scalar, as_float, replace_columns, validate_columns};
use datafusion::functions_aggregate::expr_fn::{avg, stddev_pop};
use datafusion::logical_expr::lit;
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Learned location and scale of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: f64,
    pub scale: f64,
}

fn as_f64(scalar: ScalarValue, what: &str, col_name: &str) -> ChurnPipelineResult<Option<f64>> {
    match scalar {
        ScalarValue::Float64(value) => Ok(value),
        ScalarValue::Null => Ok(None),
        other => Err(ChurnPipelineError::InvalidParameter(format!(
            "Failed to compute {} for column {}: got {:?}",
            what, col_name, other
        ))),
    }
}

/// Scales numeric columns to zero mean and unit variance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub columns: Vec<String>,
    pub stats: HashMap<String, ColumnStats>,
    fitted: bool,
}

impl StandardScaler {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            stats: HashMap::new(),
            fitted: false,
        }
    }

    /// Compute the mean and population standard deviation of every target column.
    pub async fn fit(&mut self, df: &DataFrame) -> ChurnPipelineResult<()> {
        validate_columns(df, &self.columns)?;
        let stats = try_join_all(self.columns.iter().map(|col_name| async move {
            let mean = aggregate_scalar(df, avg(as_float(col_name)).alias("mean")).await?;
            let std = aggregate_scalar(df, stddev_pop(as_float(col_name)).alias("std")).await?;
            let mean = as_f64(mean, "mean", col_name)?.unwrap_or(0.0);
            let scale = match as_f64(std, "standard deviation", col_name)? {
                Some(s) if s.is_finite() && s > 0.0 => s,
                _ => 1.0,
            };
            Ok::<_, ChurnPipelineError>(ColumnStats { mean, scale })
        }))
        .await?;
        self.stats = self.columns.iter().cloned().zip(stats).collect();
        self.fitted = true;
        Ok(())
    }

    /// Returns a new DataFrame where each target column is replaced by `(x - mean) / scale`.
    pub fn transform(&self, df: DataFrame) -> ChurnPipelineResult<DataFrame> {
        if !self.fitted {
            return Err(ChurnPipelineError::FitNotCalled);
        }
        validate_columns(&df, &self.columns)?;
        replace_columns(df, &self.columns, |name| {
            let stats = self.stats.get(name).copied().unwrap_or(ColumnStats {
                mean: 0.0,
                scale: 1.0,
            });
            (as_float(name) - lit(stats.mean)) / lit(stats.scale)
        })
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(StandardScaler);
