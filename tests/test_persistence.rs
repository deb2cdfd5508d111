use churn_pipeline::exceptions::{ChurnPipelineError, ChurnPipelineResult};
use churn_pipeline::persistence::{load_pipeline, save_pipeline};
use churn_pipeline::preprocess::Preprocessor;

mod common;
use common::{churn_frame, churn_frame_with_gaps};

#[tokio::test]
async fn test_saved_pipeline_reproduces_outputs() -> ChurnPipelineResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("models").join("nested").join("pipeline.bin");

    let preprocessor = Preprocessor::new();
    let (fitted, pipeline) = preprocessor.fit(churn_frame_with_gaps().await).await?;
    save_pipeline(&pipeline, &path)?;
    assert!(path.is_file());

    let restored = load_pipeline(&path)?;
    assert_eq!(restored.feature_names(), pipeline.feature_names());
    assert_eq!(restored.feature_types(), pipeline.feature_types());
    let branches: Vec<(&str, &[String])> = restored
        .branches()
        .iter()
        .map(|b| (b.name(), b.columns()))
        .collect();
    assert_eq!(
        branches,
        vec![
            ("num", pipeline.feature_types().numeric()),
            ("cat", pipeline.feature_types().categorical()),
        ]
    );

    let reapplied = preprocessor
        .apply(&restored, churn_frame_with_gaps().await)
        .await?;
    assert_eq!(reapplied, fitted);
    Ok(())
}

#[tokio::test]
async fn test_save_leaves_no_partial_file() -> ChurnPipelineResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("pipeline.bin");

    let (_, pipeline) = Preprocessor::new().fit(churn_frame().await).await?;
    save_pipeline(&pipeline, &path)?;
    // Overwriting an existing artifact replaces it in place.
    save_pipeline(&pipeline, &path)?;

    let entries: Vec<String> = std::fs::read_dir(dir.path())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(entries, vec!["pipeline.bin"]);
    Ok(())
}

#[tokio::test]
async fn test_truncated_artifact_fails_to_load() -> ChurnPipelineResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("pipeline.bin");

    let (_, pipeline) = Preprocessor::new().fit(churn_frame().await).await?;
    save_pipeline(&pipeline, &path)?;
    let bytes = std::fs::read(&path)?;
    std::fs::write(&path, &bytes[..bytes.len() / 2])?;

    assert!(matches!(
        load_pipeline(&path),
        Err(ChurnPipelineError::SerializationError(_))
    ));
    Ok(())
}

#[test]
fn test_missing_artifact_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never_saved.bin");
    match load_pipeline(&path) {
        Err(ChurnPipelineError::NotFound(p)) => assert_eq!(p, path),
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
}
