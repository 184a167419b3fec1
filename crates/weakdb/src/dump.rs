use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::artifacts::{self, Extension, StagedWrite};
use crate::error::{DumpError, Result};
use crate::neighbors::{DuplicateNeighborAnomaly, NeighborRanker, RankerConfig};
use crate::schema::{validate_dump_name, DatapointType, DumpManifest, DumpShape};

/// Validated, immutable dump ready to be written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dump {
    pub name: String,
    pub description: String,
    pub shape: DumpShape,
    pub lf_names: Vec<String>,
    pub lf_matrix: Vec<i32>,
    pub prob_labels: Vec<f64>,
    pub extension: Option<ExtendedData>,
    pub ground_truth_labels: Option<Vec<i32>>,
    pub datapoint_type: DatapointType,
    pub datapoints: Vec<String>,
    pub sorted_dists: Option<Vec<Vec<usize>>>,
}

/// LF votes and label-model output after the augmentation pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtendedData {
    pub lf_matrix: Vec<i32>,
    pub prob_labels: Vec<f64>,
}

/// Collects dump fields one setter at a time. Each setter checks the
/// incoming length against the shape fixed at construction.
#[derive(Clone, Debug)]
pub struct DumpBuilder {
    shape: DumpShape,
    ranker: NeighborRanker,
    name: Option<String>,
    description: String,
    lf_names: Vec<String>,
    lf_matrix: Option<Vec<i32>>,
    extended_lf_matrix: Option<Vec<i32>>,
    prob_labels: Option<Vec<f64>>,
    extended_prob_labels: Option<Vec<f64>>,
    ground_truth_labels: Option<Vec<i32>>,
    datapoint_type: DatapointType,
    datapoints: Option<Vec<String>>,
    sorted_dists: Option<Vec<Vec<usize>>>,
    anomalies: Vec<DuplicateNeighborAnomaly>,
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(DumpError::ShapeMismatch { field, expected, actual });
    }
    Ok(())
}

impl DumpBuilder {
    pub fn new(shape: DumpShape) -> Self {
        let lf_names = (0..shape.num_lf).map(|i| format!("LF{i}")).collect();
        Self {
            shape,
            ranker: NeighborRanker::default(),
            name: None,
            description: String::new(),
            lf_names,
            lf_matrix: None,
            extended_lf_matrix: None,
            prob_labels: None,
            extended_prob_labels: None,
            ground_truth_labels: None,
            datapoint_type: DatapointType::default(),
            datapoints: None,
            sorted_dists: None,
            anomalies: Vec::new(),
        }
    }

    pub fn with_ranker(mut self, config: RankerConfig) -> Self {
        self.ranker = NeighborRanker::new(config);
        self
    }

    pub fn shape(&self) -> DumpShape {
        self.shape
    }

    /// Self-match anomalies seen by the last `set_similarity_matrix` call.
    pub fn anomalies(&self) -> &[DuplicateNeighborAnomaly] {
        &self.anomalies
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_dump_name(&name)?;
        self.name = Some(name);
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_lf_names(&mut self, lf_names: Vec<String>) -> Result<()> {
        check_len("lf_names", self.shape.num_lf, lf_names.len())?;
        self.lf_names = lf_names;
        Ok(())
    }

    pub fn set_lf_matrix(&mut self, lf_matrix: Vec<i32>) -> Result<()> {
        check_len("lf_matrix", self.shape.lf_matrix_len(), lf_matrix.len())?;
        self.lf_matrix = Some(lf_matrix);
        Ok(())
    }

    pub fn set_extended_lf_matrix(&mut self, lf_matrix: Vec<i32>) -> Result<()> {
        check_len("extended_lf_matrix", self.shape.lf_matrix_len(), lf_matrix.len())?;
        self.extended_lf_matrix = Some(lf_matrix);
        Ok(())
    }

    pub fn set_prob_labels(&mut self, prob_labels: Vec<f64>) -> Result<()> {
        check_len("prob_labels", self.shape.num_datapoints(), prob_labels.len())?;
        self.prob_labels = Some(prob_labels);
        Ok(())
    }

    pub fn set_extended_prob_labels(&mut self, prob_labels: Vec<f64>) -> Result<()> {
        check_len("extended_prob_labels", self.shape.num_datapoints(), prob_labels.len())?;
        self.extended_prob_labels = Some(prob_labels);
        Ok(())
    }

    pub fn set_ground_truth(&mut self, labels: Vec<i32>) -> Result<()> {
        check_len("ground_truth_labels", self.shape.num_datapoints(), labels.len())?;
        self.ground_truth_labels = Some(labels);
        Ok(())
    }

    pub fn set_datapoints(&mut self, datapoint_type: DatapointType, datapoints: Vec<String>) -> Result<()> {
        check_len("datapoints", self.shape.num_datapoints(), datapoints.len())?;
        self.datapoint_type = datapoint_type;
        self.datapoints = Some(datapoints);
        Ok(())
    }

    /// `similarity` is row-major `(num_train + num_val) x num_train`, higher
    /// is more similar. Training rows are ranked with themselves excluded.
    pub fn set_similarity_matrix(&mut self, similarity: &[f64]) -> Result<()> {
        check_len("similarity_matrix", self.shape.similarity_len(), similarity.len())?;

        let num_train = self.shape.num_train;
        let mut sorted_dists = Vec::with_capacity(self.shape.num_datapoints());
        let mut anomalies = Vec::new();

        for row_idx in 0..self.shape.num_datapoints() {
            let row = &similarity[row_idx * num_train..(row_idx + 1) * num_train];
            let query = (row_idx < num_train).then_some(row_idx);
            let ranked = self.ranker.rank(row, query);
            anomalies.extend(ranked.anomaly);
            sorted_dists.push(ranked.ranking);
        }

        self.sorted_dists = Some(sorted_dists);
        self.anomalies = anomalies;
        Ok(())
    }

    pub fn build(self) -> Result<Dump> {
        let name = self.name.ok_or(DumpError::MissingField("name"))?;
        let lf_matrix = self.lf_matrix.ok_or(DumpError::MissingField("lf_matrix"))?;
        let prob_labels = self.prob_labels.ok_or(DumpError::MissingField("prob_labels"))?;
        let datapoints = self.datapoints.ok_or(DumpError::MissingField("datapoints"))?;

        let extension = match (self.extended_lf_matrix, self.extended_prob_labels) {
            (Some(lf_matrix), Some(prob_labels)) => Some(ExtendedData { lf_matrix, prob_labels }),
            (None, None) => None,
            (lf, prob) => {
                return Err(DumpError::IncompleteExtension {
                    lf_matrix: lf.is_some(),
                    prob_labels: prob.is_some(),
                })
            }
        };

        Ok(Dump {
            name,
            description: self.description,
            shape: self.shape,
            lf_names: self.lf_names,
            lf_matrix,
            prob_labels,
            extension,
            ground_truth_labels: self.ground_truth_labels,
            datapoint_type: self.datapoint_type,
            datapoints,
            sorted_dists: self.sorted_dists,
        })
    }
}

impl Dump {
    pub fn manifest(&self) -> DumpManifest {
        DumpManifest {
            name: self.name.clone(),
            description: self.description.clone(),
            num_lf: self.shape.num_lf,
            num_train: self.shape.num_train,
            num_val: self.shape.num_val,
            datatype: self.datapoint_type,
            lf_names: self.lf_names.clone(),
            has_extended_data: self.extension.is_some(),
            has_similarity_data: self.sorted_dists.is_some(),
            has_ground_truth: self.ground_truth_labels.is_some(),
            artifacts: Default::default(),
            content_hash: String::new(),
        }
    }

    /// Writes every artifact into `target_dir` and returns the published
    /// manifest (with its digest table filled in).
    pub fn save_json(&self, target_dir: &Path) -> Result<DumpManifest> {
        let name = self.name.as_str();
        let mut staged = StagedWrite::new(target_dir)?;

        staged.add_json(artifacts::lf_matrix_file_name(name, Extension::NoExt), &self.lf_matrix)?;
        staged.add_json(artifacts::prob_labels_file_name(name, Extension::NoExt), &self.prob_labels)?;
        staged.add_json(artifacts::datapoints_file_name(name), &self.datapoints)?;

        if let Some(ext) = &self.extension {
            staged.add_json(artifacts::lf_matrix_file_name(name, Extension::Ext), &ext.lf_matrix)?;
            staged.add_json(artifacts::prob_labels_file_name(name, Extension::Ext), &ext.prob_labels)?;
        }
        if let Some(gt) = &self.ground_truth_labels {
            staged.add_json(artifacts::ground_truth_file_name(name), gt)?;
        }
        if let Some(dists) = &self.sorted_dists {
            staged.add_json(artifacts::sorted_dists_file_name(name), dists)?;
        }

        let manifest = staged.commit(self.manifest())?;
        artifacts::remove_stale(target_dir, &manifest);

        info!(
            dump = %manifest.name,
            dir = %target_dir.display(),
            artifacts = manifest.artifacts.len(),
            content_hash = %manifest.content_hash,
            "dump saved"
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_builder() -> DumpBuilder {
        let mut b = DumpBuilder::new(DumpShape::new(2, 1, 2));
        b.set_name("scenario").unwrap();
        b.set_lf_matrix(vec![1, -1, 0, 1, -1, 0]).unwrap();
        b.set_prob_labels(vec![0.9, 0.1, 0.5]).unwrap();
        b.set_datapoints(DatapointType::Text, vec!["a".into(), "b".into(), "c".into()]).unwrap();
        b
    }

    #[test]
    fn test_default_lf_names() {
        let b = DumpBuilder::new(DumpShape::new(1, 0, 3));
        assert_eq!(b.lf_names, vec!["LF0", "LF1", "LF2"]);
    }

    #[test]
    fn test_setters_reject_wrong_lengths() {
        let mut b = DumpBuilder::new(DumpShape::new(2, 1, 2));
        match b.set_lf_matrix(vec![1, 0, 1]) {
            Err(DumpError::ShapeMismatch { field, expected, actual }) => {
                assert_eq!(field, "lf_matrix");
                assert_eq!(expected, 6);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(b.set_prob_labels(vec![0.5]), Err(DumpError::ShapeMismatch { field: "prob_labels", .. })));
        assert!(matches!(b.set_lf_names(vec!["only".into()]), Err(DumpError::ShapeMismatch { field: "lf_names", .. })));
        assert!(matches!(b.set_similarity_matrix(&[1.0; 5]), Err(DumpError::ShapeMismatch { field: "similarity_matrix", .. })));
        assert!(matches!(b.set_name(""), Err(DumpError::EmptyName)));
    }

    #[test]
    fn test_name_must_be_a_plain_file_stem() {
        let mut b = DumpBuilder::new(DumpShape::new(1, 0, 1));
        for bad in ["../escaped", "a/b", "a\\b", "dump.v2", "with space", ".."] {
            assert!(matches!(b.set_name(bad), Err(DumpError::InvalidName(_))), "{bad}");
        }
        assert!(matches!(b.set_name("   "), Err(DumpError::EmptyName)));
        b.set_name("lvis_val-2017").unwrap();
    }

    #[test]
    fn test_similarity_scenario() {
        let mut b = scenario_builder();
        // rows: train 0, train 1, val 0
        b.set_similarity_matrix(&[1.0, 0.3, 0.9, 0.2, 0.4, 0.8]).unwrap();
        assert_eq!(b.anomalies(), &[DuplicateNeighborAnomaly { query_idx: 1, top_idx: 0 }]);

        let dump = b.build().unwrap();
        assert_eq!(dump.sorted_dists, Some(vec![vec![1], vec![0], vec![1, 0]]));
    }

    #[test]
    fn test_build_requires_complete_extension() {
        let mut b = scenario_builder();
        b.set_extended_lf_matrix(vec![1, 1, 1, 1, 1, 1]).unwrap();
        assert!(matches!(
            b.build(),
            Err(DumpError::IncompleteExtension { lf_matrix: true, prob_labels: false })
        ));
    }

    #[test]
    fn test_build_requires_core_fields() {
        let mut b = DumpBuilder::new(DumpShape::new(1, 0, 1));
        b.set_name("x").unwrap();
        assert!(matches!(b.build(), Err(DumpError::MissingField("lf_matrix"))));
    }

    #[test]
    fn test_manifest_flags_follow_option_state() {
        let mut b = scenario_builder();
        b.set_ground_truth(vec![]).unwrap_err();
        b.set_ground_truth(vec![1, 0, 1]).unwrap();
        let m = b.build().unwrap().manifest();
        assert!(m.has_ground_truth);
        assert!(!m.has_extended_data);
        assert!(!m.has_similarity_data);
    }

    #[test]
    fn test_empty_but_present_arrays_count_as_present() {
        let mut b = DumpBuilder::new(DumpShape::new(0, 0, 3));
        b.set_name("empty").unwrap();
        b.set_lf_matrix(vec![]).unwrap();
        b.set_prob_labels(vec![]).unwrap();
        b.set_datapoints(DatapointType::ImageUrl, vec![]).unwrap();
        b.set_extended_lf_matrix(vec![]).unwrap();
        b.set_extended_prob_labels(vec![]).unwrap();
        b.set_similarity_matrix(&[]).unwrap();
        let m = b.build().unwrap().manifest();
        assert!(m.has_extended_data);
        assert!(m.has_similarity_data);
        assert!(!m.has_ground_truth);
    }
}
