use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};
use crate::palette::{key_binding_for, CategoryPalette};
use crate::schema::{
    canonical_labeler, BoundingBox, CategoryStyle, LabelSubmission, LabelerResult, TaskId, MAX_CATEGORIES,
};

/// One labeling assignment: the datapoints to label, the categories a labeler
/// may choose from and every labeler's results so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelingTask {
    task_id: TaskId,
    #[serde(default)]
    description: String,
    /// Kept in authoring order; the labeling UI lists categories as stored.
    #[serde(default)]
    categories: IndexMap<String, CategoryStyle>,
    datapoint_urls: Vec<String>,
    #[serde(default)]
    datapoint_boxes: Vec<Vec<BoundingBox>>,
    #[serde(default)]
    labeler_results: BTreeMap<String, LabelerResult>,
}

impl Default for LabelingTask {
    fn default() -> Self {
        Self::new()
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(TaskError::ShapeMismatch { field, expected, actual });
    }
    Ok(())
}

impl LabelingTask {
    pub fn new() -> Self {
        Self {
            task_id: TaskId::generate(),
            description: String::new(),
            categories: IndexMap::new(),
            datapoint_urls: Vec::new(),
            datapoint_boxes: Vec::new(),
            labeler_results: BTreeMap::new(),
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn categories(&self) -> &IndexMap<String, CategoryStyle> {
        &self.categories
    }

    pub fn datapoint_urls(&self) -> &[String] {
        &self.datapoint_urls
    }

    pub fn datapoint_boxes(&self) -> &[Vec<BoundingBox>] {
        &self.datapoint_boxes
    }

    pub fn labeler_results(&self) -> &BTreeMap<String, LabelerResult> {
        &self.labeler_results
    }

    pub fn labeler_result(&self, labeler: &str) -> Option<&LabelerResult> {
        let key = canonical_labeler(labeler).ok()?;
        self.labeler_results.get(&key)
    }

    pub fn num_datapoints(&self) -> usize {
        self.datapoint_urls.len()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_datapoints(&mut self, urls: Vec<String>) -> Result<()> {
        if !self.labeler_results.is_empty() && urls.len() != self.num_datapoints() {
            return Err(TaskError::DatapointsLocked {
                current: self.num_datapoints(),
                requested: urls.len(),
            });
        }
        if !self.datapoint_boxes.is_empty() && urls.len() != self.datapoint_boxes.len() {
            self.datapoint_boxes.clear();
        }
        self.datapoint_urls = urls;
        Ok(())
    }

    pub fn set_datapoint_boxes(&mut self, boxes: Vec<Vec<BoundingBox>>) -> Result<()> {
        check_len("datapoint_boxes", self.num_datapoints(), boxes.len())?;
        self.datapoint_boxes = boxes;
        Ok(())
    }

    /// Maps category names to keys 1..9, 0 in input order, with the default
    /// palette.
    pub fn assign_categories<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        self.assign_categories_with_palette(names, &CategoryPalette::default())
    }

    pub fn assign_categories_with_palette<S: AsRef<str>>(
        &mut self,
        names: &[S],
        palette: &CategoryPalette,
    ) -> Result<()> {
        if names.len() > MAX_CATEGORIES {
            return Err(TaskError::TooManyCategories { requested: names.len(), max: MAX_CATEGORIES });
        }

        let mut categories = IndexMap::new();
        for (position, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let key_binding = key_binding_for(position);
            let style = CategoryStyle { key_binding, color: palette.color_for(key_binding).to_string() };
            if categories.insert(name.to_string(), style).is_some() {
                return Err(TaskError::DuplicateCategory(name.to_string()));
            }
        }

        self.categories = categories;
        Ok(())
    }

    /// Explicit name -> {key_binding, color} mapping, bypassing automatic
    /// assignment. Categories keep the iteration order of `mapping`.
    pub fn assign_category_mapping(
        &mut self,
        mapping: impl IntoIterator<Item = (String, CategoryStyle)>,
    ) -> Result<()> {
        let mut categories = IndexMap::new();
        for (name, style) in mapping {
            if categories.contains_key(&name) {
                return Err(TaskError::DuplicateCategory(name));
            }
            categories.insert(name, style);
        }
        validate_categories(&categories)?;
        self.categories = categories;
        Ok(())
    }

    /// Copies description, categories, datapoints and boxes from `authored`.
    /// Labeler results on `self` are untouched, so the datapoint count is
    /// locked once any exist.
    pub fn apply_authoring(&mut self, authored: &LabelingTask) -> Result<()> {
        let m = authored.num_datapoints();
        if !self.labeler_results.is_empty() && m != self.num_datapoints() {
            return Err(TaskError::DatapointsLocked { current: self.num_datapoints(), requested: m });
        }
        if !authored.datapoint_boxes.is_empty() {
            check_len("datapoint_boxes", m, authored.datapoint_boxes.len())?;
        }
        validate_categories(&authored.categories)?;

        self.description = authored.description.clone();
        self.categories = authored.categories.clone();
        self.datapoint_urls = authored.datapoint_urls.clone();
        self.datapoint_boxes = authored.datapoint_boxes.clone();
        Ok(())
    }

    /// Replaces only this labeler's `labels`; recorded times stay.
    pub fn record_labeler_result(&mut self, labeler: &str, labels: Vec<i32>) -> Result<()> {
        check_len("labels", self.num_datapoints(), labels.len())?;
        let key = canonical_labeler(labeler)?;
        self.labeler_results.entry(key).or_default().labels = Some(labels);
        Ok(())
    }

    /// Replaces only this labeler's `labeling_times`; recorded labels stay.
    pub fn record_labeling_times(&mut self, labeler: &str, times: Vec<f64>) -> Result<()> {
        check_len("labeling_times", self.num_datapoints(), times.len())?;
        let key = canonical_labeler(labeler)?;
        self.labeler_results.entry(key).or_default().labeling_times = Some(times);
        Ok(())
    }

    /// Applies labels and (optionally) times from one submission. Everything is
    /// checked before anything is written, so a rejected submission leaves the
    /// task unchanged.
    pub fn apply_submission(&mut self, submission: &LabelSubmission) -> Result<String> {
        let key = canonical_labeler(&submission.labeler_name)?;
        check_len("labels", self.num_datapoints(), submission.labels.len())?;
        if let Some(times) = &submission.labeling_times {
            check_len("labeling_times", self.num_datapoints(), times.len())?;
        }

        let entry = self.labeler_results.entry(key.clone()).or_default();
        entry.labels = Some(submission.labels.clone());
        if let Some(times) = &submission.labeling_times {
            entry.labeling_times = Some(times.clone());
        }
        Ok(key)
    }

    /// Checks the invariants a stored record must satisfy.
    pub fn validate(&self) -> Result<()> {
        validate_categories(&self.categories)?;
        let m = self.num_datapoints();
        if !self.datapoint_boxes.is_empty() {
            check_len("datapoint_boxes", m, self.datapoint_boxes.len())?;
        }
        for result in self.labeler_results.values() {
            if let Some(labels) = &result.labels {
                check_len("labels", m, labels.len())?;
            }
            if let Some(times) = &result.labeling_times {
                check_len("labeling_times", m, times.len())?;
            }
        }
        Ok(())
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| TaskError::corrupt(&self.task_id, e))
    }

    /// Parses a stored record. `origin` names it in errors.
    pub fn from_json_slice(bytes: &[u8], origin: &str) -> Result<Self> {
        let task: LabelingTask = serde_json::from_slice(bytes).map_err(|e| TaskError::corrupt(origin, e))?;
        task.validate().map_err(|e| TaskError::corrupt(origin, e))?;
        Ok(task)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TaskError::TaskNotFound(path.display().to_string()),
            _ => TaskError::io(path, e),
        })?;
        Self::from_json_slice(&bytes, &path.display().to_string())
    }

    /// Writes to a temporary file next to `path` and renames it into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_json_vec()?;
        write_atomic(path, &bytes)
    }
}

fn validate_categories(categories: &IndexMap<String, CategoryStyle>) -> Result<()> {
    if categories.len() > MAX_CATEGORIES {
        return Err(TaskError::TooManyCategories { requested: categories.len(), max: MAX_CATEGORIES });
    }
    let mut seen = HashSet::new();
    for (name, style) in categories {
        if style.key_binding > 9 {
            return Err(TaskError::InvalidKeyBinding { category: name.clone(), key_binding: style.key_binding });
        }
        if !seen.insert(style.key_binding) {
            return Err(TaskError::DuplicateKeyBinding(style.key_binding));
        }
    }
    Ok(())
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| TaskError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| TaskError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| TaskError::io(path, e.error))?;
    Ok(())
}
