//! Upstream dataset producers plug in here. The builder only ever sees a
//! `RawDataset`; knowledge of any producer's file naming stays in its adapter.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::info;

use crate::dump::DumpBuilder;
use crate::error::{DumpError, Result};
use crate::neighbors::RankerConfig;
use crate::schema::{validate_dump_name, DatapointType, DumpShape};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawDataset {
    pub name: String,
    pub description: String,
    pub shape: DumpShape,
    pub lf_names: Option<Vec<String>>,
    pub lf_matrix: Vec<i32>,
    pub prob_labels: Vec<f64>,
    pub extended_lf_matrix: Option<Vec<i32>>,
    pub extended_prob_labels: Option<Vec<f64>>,
    pub ground_truth_labels: Option<Vec<i32>>,
    pub datapoint_type: DatapointType,
    pub datapoints: Vec<String>,
    /// Row-major `(num_train + num_val) x num_train`.
    pub similarity: Option<Vec<f64>>,
}

pub trait RawDatasetSource {
    fn load(&self) -> Result<RawDataset>;
}

impl DumpBuilder {
    /// Runs every setter for the data `source` provides.
    pub fn from_source(source: &dyn RawDatasetSource, ranker: RankerConfig) -> Result<Self> {
        let raw = source.load()?;
        let mut b = DumpBuilder::new(raw.shape).with_ranker(ranker);

        b.set_name(raw.name)?;
        b.set_description(raw.description);
        if let Some(names) = raw.lf_names {
            b.set_lf_names(names)?;
        }
        b.set_lf_matrix(raw.lf_matrix)?;
        b.set_prob_labels(raw.prob_labels)?;
        if let Some(m) = raw.extended_lf_matrix {
            b.set_extended_lf_matrix(m)?;
        }
        if let Some(p) = raw.extended_prob_labels {
            b.set_extended_prob_labels(p)?;
        }
        if let Some(gt) = raw.ground_truth_labels {
            b.set_ground_truth(gt)?;
        }
        b.set_datapoints(raw.datapoint_type, raw.datapoints)?;
        if let Some(sim) = raw.similarity {
            b.set_similarity_matrix(&sim)?;
        }
        Ok(b)
    }
}

const TRAIN_SPLIT: &str = "train";
const VAL_SPLIT: &str = "val";

/// Reads the table layout of the tennis-shot producer, stored as JSON.
///
/// `<name>_<split>.json` rows hold `2 * num_lf + 3` columns: LF votes,
/// extended LF votes, label-model probability, extended probability and the
/// ground-truth label. `<name>_<split>_dists.json` rows are similarities
/// against the training split; `<name>_<split>_paths.json` holds image paths.
#[derive(Clone, Debug)]
pub struct LegacyTableSource {
    pub src_dir: PathBuf,
    pub dump_name: String,
    pub description: String,
    pub lf_names: Option<Vec<String>>,
}

impl LegacyTableSource {
    pub fn new(src_dir: impl Into<PathBuf>, dump_name: impl Into<String>) -> Self {
        Self {
            src_dir: src_dir.into(),
            dump_name: dump_name.into(),
            description: String::new(),
            lf_names: None,
        }
    }

    fn path(&self, split: &str, suffix: &str) -> PathBuf {
        self.src_dir.join(format!("{}_{split}{suffix}.json", self.dump_name))
    }

    fn read_split(&self, split: &str) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>, Vec<String>)> {
        let table = read_json::<Vec<Vec<f64>>>(&self.path(split, ""))?;
        let dists = read_json::<Vec<Vec<f64>>>(&self.path(split, "_dists"))?;
        let paths = read_json::<Vec<String>>(&self.path(split, "_paths"))?;
        Ok((table, dists, paths))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| DumpError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| DumpError::json(path, e))
}

/// `clip.mp4` -> `clip-1.jpg`: the producer stores the first extracted frame
/// next to each clip.
fn frame_path(path: &str) -> String {
    let stem = path
        .char_indices()
        .rev()
        .nth(3)
        .map(|(i, _)| &path[..i])
        .unwrap_or("");
    format!("{stem}-1.jpg")
}

impl RawDatasetSource for LegacyTableSource {
    fn load(&self) -> Result<RawDataset> {
        validate_dump_name(&self.dump_name)?;
        let (train, train_dists, train_paths) = self.read_split(TRAIN_SPLIT)?;
        let (val, val_dists, val_paths) = self.read_split(VAL_SPLIT)?;

        let cols = train
            .first()
            .or_else(|| val.first())
            .map(|r| r.len())
            .ok_or_else(|| DumpError::Source("LF tables are empty".into()))?;
        if cols < 3 || (cols - 3) % 2 != 0 {
            return Err(DumpError::Source(format!("LF table has {cols} columns, expected 2 * num_lf + 3")));
        }
        let num_lf = (cols - 3) / 2;
        let shape = DumpShape::new(train.len(), val.len(), num_lf);

        info!(
            dump = %self.dump_name,
            src = %self.src_dir.display(),
            num_lf,
            num_train = shape.num_train,
            num_val = shape.num_val,
            "loading legacy dataset tables"
        );

        let mut raw = RawDataset {
            name: self.dump_name.clone(),
            description: self.description.clone(),
            shape,
            lf_names: self.lf_names.clone(),
            ..Default::default()
        };
        let mut ext_lf = Vec::with_capacity(shape.lf_matrix_len());
        let mut ext_prob = Vec::with_capacity(shape.num_datapoints());
        let mut gt = Vec::with_capacity(shape.num_datapoints());

        for (i, row) in train.iter().chain(val.iter()).enumerate() {
            if row.len() != cols {
                return Err(DumpError::Source(format!("row {i} has {} columns, expected {cols}", row.len())));
            }
            raw.lf_matrix.extend(row[..num_lf].iter().map(|v| *v as i32));
            ext_lf.extend(row[num_lf..2 * num_lf].iter().map(|v| *v as i32));
            raw.prob_labels.push(row[2 * num_lf]);
            ext_prob.push(row[2 * num_lf + 1]);
            gt.push(row[2 * num_lf + 2] as i32);
        }
        raw.extended_lf_matrix = Some(ext_lf);
        raw.extended_prob_labels = Some(ext_prob);
        raw.ground_truth_labels = Some(gt);

        raw.datapoint_type = DatapointType::ImageUrl;
        raw.datapoints = train_paths.iter().chain(val_paths.iter()).map(|p| frame_path(p)).collect();

        let mut similarity = Vec::with_capacity(shape.similarity_len());
        for (i, row) in train_dists.iter().chain(val_dists.iter()).enumerate() {
            if row.len() != shape.num_train {
                return Err(DumpError::Source(format!(
                    "similarity row {i} has {} entries, expected {}",
                    row.len(),
                    shape.num_train
                )));
            }
            similarity.extend_from_slice(row);
        }
        raw.similarity = Some(similarity);

        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_path() {
        assert_eq!(frame_path("clips/serve_01.mp4"), "clips/serve_01-1.jpg");
        assert_eq!(frame_path("abc"), "-1.jpg");
    }
}
