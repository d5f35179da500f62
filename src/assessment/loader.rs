use std::fs;
use std::path::{Path, PathBuf};

use super::engine::AssessmentEngine;
use super::schema::AssessmentSchema;
use super::validate::SchemaValidationError;

/// Failure to read, parse, or validate a schema document.
#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    #[error("failed to read schema document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse schema document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),
}

/// Read a schema JSON document from disk.
pub fn load_schema(path: impl AsRef<Path>) -> Result<AssessmentSchema, SchemaLoadError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| SchemaLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SchemaLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read, parse, validate, and compile a schema document into an engine.
pub fn load_engine(path: impl AsRef<Path>) -> Result<AssessmentEngine, SchemaLoadError> {
    let schema = load_schema(path)?;
    Ok(AssessmentEngine::new(schema)?)
}
