//! ## Fit/Apply Orchestration
//!
//! [`Preprocessor`] turns a raw churn dataset into a numeric feature matrix and a binary target
//! vector. It offers two operations that share target resolution and leakage exclusion:
//!
//! - [`Preprocessor::fit`] (training time): detect feature types (or use the configured split),
//!   build and fit a new pipeline, and transform the same data with it.
//! - [`Preprocessor::apply`] (inference time): transform with an existing pipeline only. Medians,
//!   modes, categories and scaling statistics are never recomputed, even when the new data's
//!   statistics differ from the training data.
//!
//! Features and target are read from one projection of the input, so row `i` of the matrix and
//! element `i` of the target vector always describe the same customer record.

use crate::exceptions::{ChurnPipelineError, ChurnPipelineResult};
use crate::feature_types::{detect_feature_types, FeatureTypes};
use crate::pipeline::{FittedPipeline, PreprocessingPipeline};
use crate::target::{canonicalize_target, TargetResolution, TargetResolver};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array};
use arrow::compute::{cast, concat};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::DataFrame;
use std::sync::Arc;
use tracing::info;

/// Name of the label column appended to processed datasets.
pub const TARGET_COLUMN: &str = "target";

/// A dense, row-major matrix of engineered features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    n_rows: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Build a matrix from the first `columns.len()` columns of the given batches.
    pub(crate) fn from_batches(
        columns: Vec<String>,
        batches: &[RecordBatch],
    ) -> ChurnPipelineResult<Self> {
        let n_cols = columns.len();
        let n_rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        let mut data = vec![0.0; n_rows * n_cols];
        let mut row_offset = 0;
        for batch in batches {
            for j in 0..n_cols {
                let values = cast(batch.column(j), &DataType::Float64)?;
                let values = values
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| {
                        ChurnPipelineError::InvalidParameter(format!(
                            "Expected Float64 array for feature {}",
                            columns[j]
                        ))
                    })?;
                for i in 0..values.len() {
                    data[(row_offset + i) * n_cols + j] = if values.is_null(i) {
                        f64::NAN
                    } else {
                        values.value(i)
                    };
                }
            }
            row_offset += batch.num_rows();
        }
        Ok(Self {
            columns,
            n_rows,
            data,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Returns `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols())
    }

    /// Row-major values.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let n_cols = self.n_cols();
        &self.data[i * n_cols..(i + 1) * n_cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_cols() + col]
    }

    /// Values of the named column, or `None` if the matrix has no such column.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let j = self.columns.iter().position(|c| c == name)?;
        Some((0..self.n_rows).map(|i| self.get(i, j)).collect())
    }

    /// Converts the matrix to an Arrow batch, optionally appending a `target` column.
    pub fn to_record_batch(&self, target: Option<&[i64]>) -> ChurnPipelineResult<RecordBatch> {
        let mut fields: Vec<Field> = self
            .columns
            .iter()
            .map(|name| Field::new(name, DataType::Float64, false))
            .collect();
        let mut arrays: Vec<ArrayRef> = (0..self.n_cols())
            .map(|j| {
                Arc::new(Float64Array::from_iter_values(
                    (0..self.n_rows).map(|i| self.get(i, j)),
                )) as ArrayRef
            })
            .collect();
        if let Some(target) = target {
            if target.len() != self.n_rows {
                return Err(ChurnPipelineError::InvalidParameter(format!(
                    "Target has {} rows but the feature matrix has {}",
                    target.len(),
                    self.n_rows
                )));
            }
            fields.push(Field::new(TARGET_COLUMN, DataType::Int64, false));
            arrays.push(Arc::new(Int64Array::from(target.to_vec())));
        }
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .map_err(ChurnPipelineError::from)
    }
}

/// Features and canonicalized target of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedData {
    pub features: FeatureMatrix,
    pub target: Vec<i64>,
}

/// Fits and applies the churn preprocessing pipeline.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    resolver: TargetResolver,
    target_hint: Option<String>,
    feature_types: Option<FeatureTypes>,
}

impl Preprocessor {
    /// Create a preprocessor with the default target candidates and automatic type detection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom target resolver.
    pub fn with_resolver(mut self, resolver: TargetResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Prefer `name` as the target column when it is present.
    pub fn with_target_hint(mut self, name: impl Into<String>) -> Self {
        self.target_hint = Some(name.into());
        self
    }

    /// Use an explicit numeric/categorical split instead of detecting it at fit time.
    pub fn with_feature_types(mut self, feature_types: FeatureTypes) -> Self {
        self.feature_types = Some(feature_types);
        self
    }

    pub fn resolver(&self) -> &TargetResolver {
        &self.resolver
    }

    /// Resolve the target of `df` and drop its leakage columns.
    pub fn prepare(&self, df: DataFrame) -> ChurnPipelineResult<(TargetResolution, DataFrame)> {
        let resolution = self
            .resolver
            .resolve(df.schema(), self.target_hint.as_deref())?;
        let df = resolution.drop_leakage(df)?;
        Ok((resolution, df))
    }

    fn validate_override(
        &self,
        feature_types: &FeatureTypes,
        resolution: &TargetResolution,
        df: &DataFrame,
    ) -> ChurnPipelineResult<()> {
        for name in feature_types.columns() {
            if name == &resolution.target || resolution.leakage.contains(name) {
                return Err(ChurnPipelineError::InvalidParameter(format!(
                    "Column '{}' is a target column and cannot be used as a feature",
                    name
                )));
            }
            if df.schema().field_with_name(None, name).is_err() {
                return Err(ChurnPipelineError::MissingColumn(format!(
                    "Column '{}' not found in DataFrame",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Fit a new pipeline on `df` and transform `df` with it.
    pub async fn fit(
        &self,
        df: DataFrame,
    ) -> ChurnPipelineResult<(ProcessedData, FittedPipeline)> {
        let (resolution, df) = self.prepare(df)?;
        let feature_types = match &self.feature_types {
            Some(types) => {
                self.validate_override(types, &resolution, &df)?;
                types.clone()
            }
            None => detect_feature_types(df.schema(), &resolution.target),
        };

        let features_df = df.clone().drop_columns(&[resolution.target.as_str()])?;
        info!("Fitting preprocessing pipeline from scratch");
        let pipeline = PreprocessingPipeline::build(feature_types)
            .fit(&features_df)
            .await?;

        let processed = Self::collect(&pipeline, df, &resolution.target).await?;
        Ok((processed, pipeline))
    }

    /// Transform `df` with an existing pipeline, without refitting anything.
    pub async fn apply(
        &self,
        pipeline: &FittedPipeline,
        df: DataFrame,
    ) -> ChurnPipelineResult<ProcessedData> {
        let (resolution, df) = self.prepare(df)?;
        info!("Applying existing preprocessing pipeline");
        Self::collect(pipeline, df, &resolution.target).await
    }

    /// Transform a label-free frame (e.g. a prediction request) with an existing pipeline.
    pub async fn transform_unlabeled(
        &self,
        pipeline: &FittedPipeline,
        df: DataFrame,
    ) -> ChurnPipelineResult<FeatureMatrix> {
        let batches = pipeline.transform(df)?.collect().await?;
        FeatureMatrix::from_batches(pipeline.feature_names().to_vec(), &batches)
    }

    async fn collect(
        pipeline: &FittedPipeline,
        df: DataFrame,
        target: &str,
    ) -> ChurnPipelineResult<ProcessedData> {
        let batches = pipeline
            .transform_with_passthrough(df, &[target])?
            .collect()
            .await?;
        let features = FeatureMatrix::from_batches(pipeline.feature_names().to_vec(), &batches)?;

        let target_index = pipeline.feature_names().len();
        let target_arrays: Vec<&dyn Array> = batches
            .iter()
            .map(|b| b.column(target_index).as_ref())
            .collect();
        let target = if target_arrays.is_empty() {
            Vec::new()
        } else {
            canonicalize_target(&concat(&target_arrays)?)?
        };

        info!(
            "Generated processed feature matrix with shape {:?}",
            features.shape()
        );
        Ok(ProcessedData { features, target })
    }
}
