use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaskError;

/// Number keys 0-9 select categories in the labeler, so a task has at most ten.
pub const MAX_CATEGORIES: usize = 10;

/// 32 lower-case hex digits for generated ids. Ids read from outside are
/// restricted to ASCII alphanumerics, `-` and `_` since they become file names.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        TaskId(Uuid::new_v4().simple().to_string())
    }

    pub fn parse(s: &str) -> Result<Self, TaskError> {
        let ok = !s.is_empty()
            && s.len() <= 128
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !ok {
            return Err(TaskError::InvalidTaskId(s.to_string()));
        }
        Ok(TaskId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl TryFrom<String> for TaskId {
    type Error = TaskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TaskId::parse(&s)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStyle {
    /// Older task files call this `value`.
    #[serde(alias = "value")]
    pub key_binding: u8,
    pub color: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelerResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labeling_times: Option<Vec<f64>>,
}

/// Body of a label submission from the labeling front-end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelSubmission {
    pub task_id: TaskId,
    pub labeler_name: String,
    pub labels: Vec<i32>,
    #[serde(default)]
    pub labeling_times: Option<Vec<f64>>,
}

/// Case-insensitive labeler identity used as the `labeler_results` key.
pub fn canonical_labeler(name: &str) -> Result<String, TaskError> {
    let canonical = name.trim().to_lowercase();
    if canonical.is_empty() {
        return Err(TaskError::InvalidLabeler(name.to_string()));
    }
    Ok(canonical)
}
