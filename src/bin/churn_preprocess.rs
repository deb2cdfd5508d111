// Preprocessing step of the churn data pipeline.
// Reads the raw dataset, fits (or reuses) the preprocessing pipeline, and writes the pipeline
// artifact and the processed dataset. Configuration comes from the environment, see `settings`.
//
// Run with `cargo run --features binaries --bin churn-preprocess`

use churn_pipeline::dataset::{load_dataset, save_processed_dataset, session};
use churn_pipeline::exceptions::ChurnPipelineResult;
use churn_pipeline::logging;
use churn_pipeline::persistence::{load_pipeline, save_pipeline};
use churn_pipeline::settings::{PipelineMode, Settings};
use tracing::{error, info};

async fn run(settings: &Settings) -> ChurnPipelineResult<()> {
    let ctx = session();
    let preprocessor = settings.preprocessor();
    let raw = load_dataset(&ctx, &settings.raw_data_path).await?;

    let processed = match settings.mode {
        PipelineMode::Fit => {
            let (processed, pipeline) = preprocessor.fit(raw).await?;
            save_pipeline(&pipeline, &settings.pipeline_path)?;
            processed
        }
        PipelineMode::Apply => {
            let pipeline = load_pipeline(&settings.pipeline_path)?;
            preprocessor.apply(&pipeline, raw).await?
        }
    };

    save_processed_dataset(&processed, &settings.processed_data_path)?;
    info!(
        "Preprocessing finished: {} rows, {} features",
        processed.features.n_rows(),
        processed.features.n_cols()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_default();

    let settings = Settings::from_env()?;
    info!("Running preprocessing in {:?} mode", settings.mode);
    if let Err(e) = run(&settings).await {
        error!("Preprocessing failed: {}", e);
        return Err(e.into());
    }
    Ok(())
}
