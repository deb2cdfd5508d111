use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use churn_pipeline::dataset::session;
use churn_pipeline::preprocess::Preprocessor;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use datafusion::datasource::MemTable;
use datafusion::prelude::DataFrame;
use tokio::runtime::Runtime;

const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];
const PAYMENT: [&str; 4] = [
    "Electronic check",
    "Mailed check",
    "Bank transfer (automatic)",
    "Credit card (automatic)",
];

fn churn_batch(n_rows: usize) -> RecordBatch {
    let tenure: Vec<Option<i64>> = (0..n_rows)
        .map(|i| (i % 17 != 0).then_some((i % 72) as i64))
        .collect();
    let charges: Vec<Option<f64>> = (0..n_rows)
        .map(|i| (i % 23 != 0).then_some(18.0 + (i % 101) as f64))
        .collect();
    let contract: Vec<Option<&str>> = (0..n_rows)
        .map(|i| (i % 31 != 0).then_some(CONTRACTS[i % CONTRACTS.len()]))
        .collect();
    let payment: Vec<Option<&str>> = (0..n_rows)
        .map(|i| Some(PAYMENT[(i / 3) % PAYMENT.len()]))
        .collect();
    let churn: Vec<Option<&str>> = (0..n_rows)
        .map(|i| Some(if i % 4 == 0 { "Yes" } else { "No" }))
        .collect();

    let schema = Arc::new(Schema::new(vec![
        Field::new("tenure", DataType::Int64, true),
        Field::new("MonthlyCharges", DataType::Float64, true),
        Field::new("Contract", DataType::Utf8, true),
        Field::new("PaymentMethod", DataType::Utf8, true),
        Field::new("Churn", DataType::Utf8, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(tenure)),
        Arc::new(Float64Array::from(charges)),
        Arc::new(StringArray::from(contract)),
        Arc::new(StringArray::from(payment)),
        Arc::new(StringArray::from(churn)),
    ];
    RecordBatch::try_new(schema, columns).unwrap()
}

async fn churn_frame(batch: &RecordBatch) -> DataFrame {
    let mem_table = MemTable::try_new(batch.schema(), vec![vec![batch.clone()]]).unwrap();
    let ctx = session();
    ctx.register_table("churn", Arc::new(mem_table)).unwrap();
    ctx.table("churn").await.unwrap()
}

fn bench_fit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("fit");

    for n_rows in [1_000, 10_000, 100_000] {
        let batch = churn_batch(n_rows);
        group.bench_with_input(BenchmarkId::new("fit", n_rows), &batch, |b, batch| {
            b.iter(|| {
                rt.block_on(async {
                    let df = churn_frame(batch).await;
                    Preprocessor::new().fit(black_box(df)).await.unwrap()
                })
            })
        });
    }
    group.finish();
}

fn bench_apply(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("apply");
    let preprocessor = Preprocessor::new();

    for n_rows in [1_000, 10_000, 100_000] {
        let batch = churn_batch(n_rows);
        let (_, pipeline) = rt
            .block_on(async { preprocessor.fit(churn_frame(&batch).await).await })
            .unwrap();
        group.bench_with_input(BenchmarkId::new("apply", n_rows), &batch, |b, batch| {
            b.iter(|| {
                rt.block_on(async {
                    let df = churn_frame(batch).await;
                    preprocessor.apply(&pipeline, black_box(df)).await.unwrap()
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fit, bench_apply);
criterion_main!(benches);
