#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use churn_pipeline::dataset::session;
use datafusion::datasource::MemTable;
use datafusion::prelude::DataFrame;

/// Registers the given columns as an in-memory table and returns it as a DataFrame.
pub async fn frame(columns: Vec<(&str, ArrayRef)>) -> DataFrame {
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));
    let arrays = columns.into_iter().map(|(_, array)| array).collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();

    let mem_table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    let ctx = session();
    ctx.register_table("t", Arc::new(mem_table)).unwrap();
    ctx.table("t").await.unwrap()
}

pub fn strings(values: &[Option<&str>]) -> ArrayRef {
    Arc::new(StringArray::from(values.to_vec()))
}

pub fn floats(values: &[Option<f64>]) -> ArrayRef {
    Arc::new(Float64Array::from(values.to_vec()))
}

pub fn ints(values: &[Option<i64>]) -> ArrayRef {
    Arc::new(Int64Array::from(values.to_vec()))
}

/// The two-customer churn export: customerID, tenure, MonthlyCharges, Contract, Churn.
pub async fn churn_frame() -> DataFrame {
    frame(vec![
        ("customerID", strings(&[Some("0001"), Some("0002")])),
        ("tenure", ints(&[Some(5), Some(24)])),
        ("MonthlyCharges", floats(&[Some(70.35), Some(89.10)])),
        (
            "Contract",
            strings(&[Some("Month-to-month"), Some("Two year")]),
        ),
        ("Churn", strings(&[Some("No"), Some("Yes")])),
    ])
    .await
}

/// The same export with `Churn` renamed to `Churn Label` and a numeric `Churn Value` column.
pub async fn churn_label_value_frame() -> DataFrame {
    frame(vec![
        ("customerID", strings(&[Some("0001"), Some("0002")])),
        ("tenure", ints(&[Some(5), Some(24)])),
        ("MonthlyCharges", floats(&[Some(70.35), Some(89.10)])),
        (
            "Contract",
            strings(&[Some("Month-to-month"), Some("Two year")]),
        ),
        ("Churn Label", strings(&[Some("No"), Some("Yes")])),
        ("Churn Value", ints(&[Some(0), Some(1)])),
    ])
    .await
}

/// A larger export with missing values, used to exercise imputation end to end.
pub async fn churn_frame_with_gaps() -> DataFrame {
    frame(vec![
        (
            "customerID",
            strings(&[Some("A"), Some("B"), Some("C"), Some("D"), Some("E")]),
        ),
        ("tenure", ints(&[Some(1), None, Some(12), Some(30), Some(60)])),
        (
            "MonthlyCharges",
            floats(&[Some(20.0), Some(50.0), None, Some(80.0), Some(110.0)]),
        ),
        (
            "Contract",
            strings(&[
                Some("Month-to-month"),
                Some("One year"),
                None,
                Some("Month-to-month"),
                Some("Two year"),
            ]),
        ),
        (
            "Churn",
            strings(&[Some("Yes"), Some("no"), Some(" YES "), None, Some("unknown")]),
        ),
    ])
    .await
}

pub fn assert_close(actual: f64, expected: f64) {
    approx::assert_abs_diff_eq!(actual, expected, epsilon = 1e-9);
}
