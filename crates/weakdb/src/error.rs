use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Shape mismatch for {field}: expected {expected} elements, got {actual}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Dump name must not be empty")]
    EmptyName,

    #[error("Invalid dump name {0:?}: use ASCII letters, digits, '-' and '_'")]
    InvalidName(String),

    #[error("Required field not set: {0}")]
    MissingField(&'static str),

    #[error("Extended data is incomplete: extended_lf_matrix set = {lf_matrix}, extended_prob_labels set = {prob_labels}")]
    IncompleteExtension { lf_matrix: bool, prob_labels: bool },

    #[error("Artifact {file} does not match manifest digest")]
    ArtifactDigestMismatch { file: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dataset source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, DumpError>;

impl DumpError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DumpError::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        DumpError::Json { path: path.into(), source }
    }
}
