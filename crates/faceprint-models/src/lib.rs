//! faceprint-models — Model manifest loading.
//!
//! A model ships as a JSON manifest: declared input shape, declared
//! descriptor length, and the ordered layer list with inline parameters.
//! Loading one yields a build-ready [`ModelDescription`] for
//! [`faceprint_core::FaceIdentifier`].

use faceprint_core::ModelDescription;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Default directory for model manifests, honoring `XDG_DATA_HOME`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("faceprint/models")
}

/// Load a model manifest from a JSON file.
pub fn load(path: &Path) -> Result<ModelDescription, ModelLoadError> {
    let file = File::open(path)?;
    let description: ModelDescription = serde_json::from_reader(BufReader::new(file))?;

    tracing::info!(
        path = %path.display(),
        name = description.name.as_deref().unwrap_or("<unnamed>"),
        layers = description.layers.len(),
        feature_len = description.feature_len,
        "loaded model manifest"
    );
    Ok(description)
}

/// Write a model description to a JSON manifest file.
pub fn save(description: &ModelDescription, path: &Path) -> Result<(), ModelLoadError> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), description)?;
    Ok(())
}
