//! ## Preprocessing Pipeline
//!
//! This module provides the abstractions for building, fitting, and applying the churn feature
//! preprocessing pipeline.
//!
//! ### Overview
//!
//! - The [`Transformer`] trait defines the common interface of every pipeline step.
//! - A [`Branch`] chains a sequence of steps over one subset of columns.
//! - [`PreprocessingPipeline`] is the unfit pipeline: a numeric branch (median imputation, then
//!   standardization) and a categorical branch (most-frequent imputation, then one-hot encoding).
//! - [`FittedPipeline`] is what fitting produces. It is a plain value: it can be cloned, shared
//!   between threads, serialized, and applied any number of times, but never refit.
//!
//! The output column order of a fitted pipeline is: the numeric columns in the order they were
//! given, then one block of indicator columns per categorical column in input order, with the
//! categories of each block sorted.

use crate::exceptions::{ChurnPipelineError, ChurnPipelineResult};
use crate::feature_types::FeatureTypes;
use crate::transformers::categorical_encoding::{unique_name, OneHotEncoder};
use crate::transformers::imputation::{MedianImputer, MostFrequentImputer};
use crate::transformers::scaling::StandardScaler;
use async_trait::async_trait;
use datafusion::logical_expr::{ident, Expr};
use datafusion::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

/// Trait for components used in the data transformation pipeline.
///
/// Every transformer must provide a `fit` method (which may collect data to compute parameters)
/// and a `transform` method (which updates the DataFrame’s logical plan without triggering execution).
#[async_trait]
pub trait Transformer {
    /// Fit the transformer given a DataFrame.
    ///
    /// # Arguments
    ///
    /// * `df` - The input DataFrame.
    async fn fit(&mut self, df: &DataFrame) -> ChurnPipelineResult<()>;

    /// Transform the input DataFrame, returning a new DataFrame with the transformation applied.
    ///
    /// # Arguments
    ///
    /// * `df` - The input DataFrame.
    fn transform(&self, df: DataFrame) -> ChurnPipelineResult<DataFrame>;

    /// Returns true if the transformer is stateful (i.e. requires a call to fit before transform can be called).
    fn is_stateful(&self) -> bool;
}

/// Macro to implement the [`Transformer`] trait for pipeline steps.
///
/// The type must already have inherent methods:
/// - `async fn fit(&mut self, &DataFrame) -> ChurnPipelineResult<()>`
/// - `fn transform(&self, DataFrame) -> ChurnPipelineResult<DataFrame>`
/// - `fn inherent_is_stateful(&self) -> bool`
#[macro_export]
macro_rules! impl_transformer {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl $crate::pipeline::Transformer for $ty {
            async fn fit(
                &mut self,
                df: &datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::ChurnPipelineResult<()> {
                <$ty>::fit(self, df).await
            }
            fn transform(
                &self,
                df: datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::ChurnPipelineResult<datafusion::prelude::DataFrame> {
                <$ty>::transform(self, df)
            }
            fn is_stateful(&self) -> bool {
                <$ty>::inherent_is_stateful(self)
            }
        }
    };
}

/// A pipeline step. Steps are a closed set so that a fitted pipeline can be serialized as data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Step {
    MedianImputer(MedianImputer),
    StandardScaler(StandardScaler),
    MostFrequentImputer(MostFrequentImputer),
    OneHotEncoder(OneHotEncoder),
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::MedianImputer(_) => "median_imputer",
            Step::StandardScaler(_) => "standard_scaler",
            Step::MostFrequentImputer(_) => "most_frequent_imputer",
            Step::OneHotEncoder(_) => "one_hot_encoder",
        }
    }

    fn as_transformer(&self) -> &(dyn Transformer + Send + Sync) {
        match self {
            Step::MedianImputer(t) => t,
            Step::StandardScaler(t) => t,
            Step::MostFrequentImputer(t) => t,
            Step::OneHotEncoder(t) => t,
        }
    }

    fn as_transformer_mut(&mut self) -> &mut (dyn Transformer + Send + Sync) {
        match self {
            Step::MedianImputer(t) => t,
            Step::StandardScaler(t) => t,
            Step::MostFrequentImputer(t) => t,
            Step::OneHotEncoder(t) => t,
        }
    }

    /// Output columns produced for the step's input columns.
    fn output_columns(&self, input: &[String]) -> Vec<String> {
        match self {
            Step::OneHotEncoder(encoder) => encoder.feature_names(),
            _ => input.to_vec(),
        }
    }
}

/// A named chain of steps applied to one subset of columns.
///
/// Each step's output (a new logical plan) is passed as input to the next step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    name: String,
    columns: Vec<String>,
    steps: Vec<Step>,
}

impl Branch {
    pub fn new(name: impl Into<String>, columns: Vec<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            columns,
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Fits each step (sequentially) and returns the DataFrame transformed by the whole branch.
    async fn fit(&mut self, df: DataFrame) -> ChurnPipelineResult<DataFrame> {
        let mut current_df = df;
        for step in self.steps.iter_mut() {
            let start = Instant::now();
            let step_name = step.name();
            let transformer = step.as_transformer_mut();
            transformer.fit(&current_df).await?;
            current_df = transformer.transform(current_df)?;
            debug!(
                "Fitted step '{}/{}' in {:?}",
                self.name,
                step_name,
                start.elapsed()
            );
        }
        Ok(current_df)
    }

    /// Applies the `transform` method of each step (without fitting).
    fn transform(&self, df: DataFrame) -> ChurnPipelineResult<DataFrame> {
        let mut current_df = df;
        for step in self.steps.iter() {
            current_df = step.as_transformer().transform(current_df)?;
        }
        Ok(current_df)
    }

    /// Columns the branch emits, in order.
    fn output_columns(&self) -> Vec<String> {
        self.steps
            .iter()
            .fold(self.columns.clone(), |cols, step| step.output_columns(&cols))
    }
}

/// An unfit preprocessing pipeline.
#[derive(Debug, Clone)]
pub struct PreprocessingPipeline {
    feature_types: FeatureTypes,
    branches: Vec<Branch>,
}

impl PreprocessingPipeline {
    /// Build the numeric and categorical branches for the given feature split.
    pub fn build(feature_types: FeatureTypes) -> Self {
        let numeric = feature_types.numeric().to_vec();
        let categorical = feature_types.categorical().to_vec();
        info!(
            "Building preprocessing pipeline with {} numerical and {} categorical features",
            numeric.len(),
            categorical.len()
        );
        let branches = vec![
            Branch::new(
                "num",
                numeric.clone(),
                vec![
                    Step::MedianImputer(MedianImputer::new(numeric.clone())),
                    Step::StandardScaler(StandardScaler::new(numeric)),
                ],
            ),
            Branch::new(
                "cat",
                categorical.clone(),
                vec![
                    Step::MostFrequentImputer(MostFrequentImputer::new(categorical.clone())),
                    Step::OneHotEncoder(OneHotEncoder::new(categorical)),
                ],
            ),
        ];
        Self {
            feature_types,
            branches,
        }
    }

    pub fn feature_types(&self) -> &FeatureTypes {
        &self.feature_types
    }

    /// Learn every step's parameters from `df` and freeze them into a [`FittedPipeline`].
    pub async fn fit(mut self, df: &DataFrame) -> ChurnPipelineResult<FittedPipeline> {
        let start = Instant::now();
        check_input_columns(df, self.feature_types.columns())?;
        let mut current_df = select_inputs(df.clone(), &self.feature_types, &[])?;
        for branch in self.branches.iter_mut() {
            current_df = branch.fit(current_df).await?;
        }
        let feature_names = self
            .branches
            .iter()
            .flat_map(|b| b.output_columns())
            .collect::<Vec<_>>();
        info!(
            "Fitted preprocessing pipeline producing {} features in {:?}",
            feature_names.len(),
            start.elapsed()
        );
        Ok(FittedPipeline {
            feature_types: self.feature_types,
            branches: self.branches,
            feature_names,
        })
    }
}

fn check_input_columns<'a>(
    df: &DataFrame,
    columns: impl Iterator<Item = &'a String>,
) -> ChurnPipelineResult<()> {
    let schema = df.schema();
    let missing: Vec<String> = columns
        .filter(|name| schema.field_with_name(None, name).is_err())
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ChurnPipelineError::SchemaMismatch { missing })
    }
}

/// Restricts `df` to the feature columns, followed by each `(source, alias)` passthrough pair.
fn select_inputs(
    df: DataFrame,
    feature_types: &FeatureTypes,
    passthrough: &[(&str, String)],
) -> ChurnPipelineResult<DataFrame> {
    let projection: Vec<Expr> = feature_types
        .columns()
        .map(|name| ident(name.as_str()))
        .chain(
            passthrough
                .iter()
                .map(|(source, alias)| ident(*source).alias(alias.as_str())),
        )
        .collect();
    df.select(projection).map_err(ChurnPipelineError::from)
}

/// A fitted preprocessing pipeline: branch structure plus learned parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    feature_types: FeatureTypes,
    branches: Vec<Branch>,
    feature_names: Vec<String>,
}

impl FittedPipeline {
    pub fn feature_types(&self) -> &FeatureTypes {
        &self.feature_types
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Source columns the pipeline was fit on, numeric first.
    pub fn input_columns(&self) -> Vec<String> {
        self.feature_types.columns().cloned().collect()
    }

    /// Output feature names in matrix column order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Returns a DataFrame holding exactly the feature columns, in pipeline order.
    ///
    /// Input columns the pipeline was not fit on are ignored. Missing input columns are an error.
    pub fn transform(&self, df: DataFrame) -> ChurnPipelineResult<DataFrame> {
        self.transform_with_passthrough(df, &[])
    }

    /// Like [`FittedPipeline::transform`], with `passthrough` columns appended unchanged after the
    /// feature columns.
    ///
    /// A passthrough column keeps its name unless that name is an input or feature column, in
    /// which case it is renamed. Callers address passthrough columns by position.
    pub(crate) fn transform_with_passthrough(
        &self,
        df: DataFrame,
        passthrough: &[&str],
    ) -> ChurnPipelineResult<DataFrame> {
        check_input_columns(&df, self.feature_types.columns())?;

        let mut taken: HashSet<String> = self
            .feature_types
            .columns()
            .chain(self.feature_names.iter())
            .cloned()
            .collect();
        let aliases: Vec<(&str, String)> = passthrough
            .iter()
            .map(|source| {
                let alias = unique_name(source, &taken);
                taken.insert(alias.clone());
                (*source, alias)
            })
            .collect();

        let mut current_df = select_inputs(df, &self.feature_types, &aliases)?;
        for branch in self.branches.iter() {
            current_df = branch.transform(current_df)?;
        }
        let projection: Vec<Expr> = self
            .feature_names
            .iter()
            .map(|name| ident(name.as_str()))
            .chain(aliases.iter().map(|(_, alias)| ident(alias.as_str())))
            .collect();
        current_df
            .select(projection)
            .map_err(ChurnPipelineError::from)
    }
}
