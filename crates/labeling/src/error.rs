use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Shape mismatch for {field}: expected {expected} elements, got {actual}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Too many categories: {requested} requested, at most {max} supported")]
    TooManyCategories { requested: usize, max: usize },

    #[error("Category listed twice: {0}")]
    DuplicateCategory(String),

    #[error("Category {category} has key binding {key_binding}, expected 0-9")]
    InvalidKeyBinding { category: String, key_binding: u8 },

    #[error("Key binding {0} is assigned to more than one category")]
    DuplicateKeyBinding(u8),

    #[error("Task already has labeler results for {current} datapoints, refusing to change to {requested}")]
    DatapointsLocked { current: usize, requested: usize },

    #[error("Invalid labeler name: {0:?}")]
    InvalidLabeler(String),

    #[error("Invalid task id: {0:?}")]
    InvalidTaskId(String),

    #[error("Task {0} already exists")]
    TaskExists(String),

    #[error("Task {0} does not exist")]
    TaskNotFound(String),

    #[error("Task {task} is corrupt: {reason}")]
    TaskCorrupt { task: String, reason: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TaskError>;

impl TaskError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaskError::Io { path: path.into(), source }
    }

    pub(crate) fn corrupt(task: impl ToString, reason: impl ToString) -> Self {
        TaskError::TaskCorrupt { task: task.to_string(), reason: reason.to_string() }
    }
}
