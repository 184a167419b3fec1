use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DumpError, Result};

/// Dump names become file-name stems inside the target directory, so only
/// ASCII alphanumerics, `-` and `_` are accepted.
pub fn validate_dump_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DumpError::EmptyName);
    }
    let ok = name.len() <= 128 && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !ok {
        return Err(DumpError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpShape {
    pub num_train: usize,
    pub num_val: usize,
    pub num_lf: usize,
}

impl DumpShape {
    pub fn new(num_train: usize, num_val: usize, num_lf: usize) -> Self {
        Self { num_train, num_val, num_lf }
    }

    /// Total datapoint count (train + val).
    pub fn num_datapoints(&self) -> usize {
        self.num_train + self.num_val
    }

    pub fn lf_matrix_len(&self) -> usize {
        self.num_datapoints() * self.num_lf
    }

    pub fn similarity_len(&self) -> usize {
        self.num_datapoints() * self.num_train
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatapointType {
    #[default]
    ImageUrl,
    ImageUrlSeq,
    Text,
}

/// Contents of `<name>.json`. Front-ends read this first to learn which
/// sibling artifacts exist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DumpManifest {
    pub name: String,
    pub description: String,
    pub num_lf: usize,
    pub num_train: usize,
    pub num_val: usize,
    pub datatype: DatapointType,
    pub lf_names: Vec<String>,
    pub has_extended_data: bool,
    pub has_similarity_data: bool,
    pub has_ground_truth: bool,
    /// file name -> blake3 hex of its bytes
    #[serde(default)]
    pub artifacts: BTreeMap<String, String>,
    #[serde(default, rename = "content_hash_hex")]
    pub content_hash: String,
}

impl DumpManifest {
    pub fn shape(&self) -> DumpShape {
        DumpShape::new(self.num_train, self.num_val, self.num_lf)
    }
}
