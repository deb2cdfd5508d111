//! ## Pipeline Persistence
//!
//! Saves and loads a [`FittedPipeline`] so the training process and the serving process share the
//! same transformation state.
//!
//! An artifact is a short header (magic bytes and a format version) followed by the bincode
//! encoding of the pipeline. Artifacts are not compatible across format versions: a header
//! mismatch is reported as [`ChurnPipelineError::IncompatibleArtifact`].
//!
//! Saving goes through a sibling temporary file that is renamed into place, so a failed save never
//! leaves a truncated artifact at the destination. Concurrent saves to the same path are
//! last-writer-wins.

use crate::exceptions::{ChurnPipelineError, ChurnPipelineResult};
use crate::pipeline::FittedPipeline;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const MAGIC: &[u8; 8] = b"CHURNPPL";

/// Bumped whenever the serialized layout of [`FittedPipeline`] changes.
pub const FORMAT_VERSION: u32 = 2;

const HEADER_LEN: usize = MAGIC.len() + 4;

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Serialize `pipeline` to `path`, creating parent directories as needed.
pub fn save_pipeline(pipeline: &FittedPipeline, path: impl AsRef<Path>) -> ChurnPipelineResult<()> {
    let path = path.as_ref();
    if path.file_name().is_none() {
        return Err(ChurnPipelineError::InvalidParameter(format!(
            "Pipeline path '{}' does not name a file",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut bytes = Vec::with_capacity(HEADER_LEN);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bincode::serialize_into(&mut bytes, pipeline)?;

    let tmp = partial_path(path);
    if let Err(e) = fs::write(&tmp, &bytes).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    info!("Saved preprocessing pipeline to {}", path.display());
    Ok(())
}

/// Deserialize a pipeline previously written by [`save_pipeline`].
pub fn load_pipeline(path: impl AsRef<Path>) -> ChurnPipelineResult<FittedPipeline> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ChurnPipelineError::NotFound(path.to_path_buf()));
    }
    info!("Loading preprocessing pipeline from {}", path.display());
    let bytes = fs::read(path)?;

    if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(ChurnPipelineError::IncompatibleArtifact(format!(
            "{} is not a churn preprocessing pipeline",
            path.display()
        )));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[MAGIC.len()..HEADER_LEN]);
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(ChurnPipelineError::IncompatibleArtifact(format!(
            "{} has format version {}, expected {}",
            path.display(),
            version,
            FORMAT_VERSION
        )));
    }

    bincode::deserialize(&bytes[HEADER_LEN..]).map_err(ChurnPipelineError::from)
}
