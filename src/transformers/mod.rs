//! # Transformer Implementations
//!
//! The submodules contain the transformer implementations used by the two branches of the
//! preprocessing pipeline: imputation and scaling for numeric columns, imputation and one-hot
//! encoding for categorical columns.

pub mod categorical_encoding;
pub mod imputation;
pub mod scaling;
