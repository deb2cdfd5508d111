//! # churn-pipeline
//!
//! Feature preprocessing core for telecom churn prediction, built on Apache DataFusion.
//!
//! The crate resolves the churn label of an arbitrary customer export, drops label-like leakage
//! columns, splits the remaining columns into numeric and categorical features, and fits a
//! column-wise pipeline (median imputation and standardization for numeric columns, most-frequent
//! imputation and one-hot encoding for categorical columns). The fitted pipeline is persisted once
//! after training and reloaded unchanged by every inference process, so training-time and
//! serving-time features are computed identically.
//!
//! ```rust,no_run
//! use churn_pipeline::dataset::{load_dataset, session};
//! use churn_pipeline::persistence::{load_pipeline, save_pipeline};
//! use churn_pipeline::preprocess::Preprocessor;
//!
//! # async fn run() -> churn_pipeline::exceptions::ChurnPipelineResult<()> {
//! let ctx = session();
//! let preprocessor = Preprocessor::new();
//!
//! // Training
//! let raw = load_dataset(&ctx, "data/raw/telecom_churn.csv").await?;
//! let (processed, pipeline) = preprocessor.fit(raw).await?;
//! save_pipeline(&pipeline, "models/preprocessing_pipeline.bin")?;
//!
//! // Serving
//! let pipeline = load_pipeline("models/preprocessing_pipeline.bin")?;
//! let batch = load_dataset(&ctx, "data/raw/new_customers.csv").await?;
//! let features = preprocessor.transform_unlabeled(&pipeline, batch).await?;
//! # let _ = (processed, features);
//! # Ok(())
//! # }
//! ```

pub mod dataset;
pub mod exceptions;
pub mod feature_types;
pub mod logging;
pub mod persistence;
pub mod pipeline;
pub mod preprocess;
pub mod settings;
pub mod target;
pub mod transformers;
