//! File layout of a dump and the staged writer that publishes it.
//!
//! Every artifact is written into a staging directory next to its final
//! location, renamed into place, and the manifest is renamed in last. Until that
//! final rename the previous manifest stays current; its digest table lets a
//! reader tell whether a sibling file belongs to it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{DumpError, Result};
use crate::schema::{validate_dump_name, DumpManifest};

const STAGING_PREFIX: &str = ".weakdb-staging-";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extension {
    NoExt,
    Ext,
}

impl Extension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Extension::NoExt => "noext",
            Extension::Ext => "ext",
        }
    }
}

pub fn manifest_file_name(dump_name: &str) -> String {
    format!("{dump_name}.json")
}

pub fn lf_matrix_file_name(dump_name: &str, ext: Extension) -> String {
    format!("{dump_name}_lfmatrix_{}.json", ext.as_str())
}

pub fn prob_labels_file_name(dump_name: &str, ext: Extension) -> String {
    format!("{dump_name}_prob_labels_{}.json", ext.as_str())
}

pub fn ground_truth_file_name(dump_name: &str) -> String {
    format!("{dump_name}_ground_truth_labels.json")
}

pub fn datapoints_file_name(dump_name: &str) -> String {
    format!("{dump_name}_datapoints.json")
}

pub fn sorted_dists_file_name(dump_name: &str) -> String {
    format!("{dump_name}_sorted_dists.json")
}

/// Artifacts that only exist for some dumps.
pub fn optional_file_names(dump_name: &str) -> Vec<String> {
    vec![
        lf_matrix_file_name(dump_name, Extension::Ext),
        prob_labels_file_name(dump_name, Extension::Ext),
        ground_truth_file_name(dump_name),
        sorted_dists_file_name(dump_name),
    ]
}

/// Deterministic hash over the digest table:
/// "<file>\n<digest>\n" for each entry in file-name order.
pub fn content_hash(artifacts: &BTreeMap<String, String>) -> String {
    let mut hasher = blake3::Hasher::new();
    for (file, digest) in artifacts {
        hasher.update(file.as_bytes());
        hasher.update(b"\n");
        hasher.update(digest.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize().as_bytes())
}

pub(crate) struct StagedWrite {
    target_dir: PathBuf,
    staging: tempfile::TempDir,
    digests: BTreeMap<String, String>,
}

impl StagedWrite {
    pub(crate) fn new(target_dir: &Path) -> Result<Self> {
        fs::create_dir_all(target_dir).map_err(|e| DumpError::io(target_dir, e))?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(target_dir)
            .map_err(|e| DumpError::io(target_dir, e))?;
        Ok(Self {
            target_dir: target_dir.to_path_buf(),
            staging,
            digests: BTreeMap::new(),
        })
    }

    pub(crate) fn add_json<T: Serialize + ?Sized>(&mut self, file_name: String, value: &T) -> Result<()> {
        let path = self.staging.path().join(&file_name);
        let bytes = serde_json::to_vec(value).map_err(|e| DumpError::json(&path, e))?;
        fs::write(&path, &bytes).map_err(|e| DumpError::io(&path, e))?;
        debug!(file = %file_name, bytes = bytes.len(), "staged artifact");
        self.digests.insert(file_name, hex::encode(blake3::hash(&bytes).as_bytes()));
        Ok(())
    }

    /// Moves staged artifacts into the target directory, then publishes the
    /// manifest. The staging directory is removed on drop either way.
    pub(crate) fn commit(self, mut manifest: DumpManifest) -> Result<DumpManifest> {
        for file_name in self.digests.keys() {
            let from = self.staging.path().join(file_name);
            let to = self.target_dir.join(file_name);
            fs::rename(&from, &to).map_err(|e| DumpError::io(&to, e))?;
        }

        manifest.content_hash = content_hash(&self.digests);
        manifest.artifacts = self.digests;

        let manifest_name = manifest_file_name(&manifest.name);
        let staged = self.staging.path().join(&manifest_name);
        let bytes = serde_json::to_vec(&manifest).map_err(|e| DumpError::json(&staged, e))?;
        fs::write(&staged, &bytes).map_err(|e| DumpError::io(&staged, e))?;

        let final_path = self.target_dir.join(&manifest_name);
        fs::rename(&staged, &final_path).map_err(|e| DumpError::io(&final_path, e))?;

        Ok(manifest)
    }
}

/// Best effort: drop optional artifacts left over from an earlier version of
/// the same dump that the current manifest no longer lists.
pub(crate) fn remove_stale(target_dir: &Path, manifest: &DumpManifest) {
    for file_name in optional_file_names(&manifest.name) {
        if manifest.artifacts.contains_key(&file_name) {
            continue;
        }
        let path = target_dir.join(&file_name);
        if !path.exists() {
            continue;
        }
        if let Err(e) = fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "failed to remove stale dump artifact");
        }
    }
}

impl DumpManifest {
    pub fn read(target_dir: &Path, dump_name: &str) -> Result<Self> {
        validate_dump_name(dump_name)?;
        let path = target_dir.join(manifest_file_name(dump_name));
        let bytes = fs::read(&path).map_err(|e| DumpError::io(&path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| DumpError::json(&path, e))
    }

    /// Re-hashes every listed artifact against the digest table.
    pub fn verify(&self, target_dir: &Path) -> Result<()> {
        for (file_name, digest) in &self.artifacts {
            let path = target_dir.join(file_name);
            let bytes = fs::read(&path).map_err(|e| DumpError::io(&path, e))?;
            if hex::encode(blake3::hash(&bytes).as_bytes()) != *digest {
                return Err(DumpError::ArtifactDigestMismatch { file: file_name.clone() });
            }
        }
        if content_hash(&self.artifacts) != self.content_hash {
            return Err(DumpError::ArtifactDigestMismatch { file: manifest_file_name(&self.name) });
        }
        Ok(())
    }
}
