//! Where task records live. The store only deals in raw bytes per task id.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{Result, TaskError};
use crate::schema::TaskId;
use crate::task::write_atomic;

pub trait TaskStorage: Send + Sync {
    fn read(&self, id: &TaskId) -> Result<Option<Vec<u8>>>;
    fn write(&self, id: &TaskId, bytes: &[u8]) -> Result<()>;
    fn list(&self) -> Result<Vec<TaskId>>;
}

/// In-memory storage (for tests and demos)
#[derive(Clone, Default)]
pub struct InMemoryTaskStorage {
    data: Arc<RwLock<HashMap<TaskId, Vec<u8>>>>,
}

impl InMemoryTaskStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStorage for InMemoryTaskStorage {
    fn read(&self, id: &TaskId) -> Result<Option<Vec<u8>>> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data.get(id).cloned())
    }

    fn write(&self, id: &TaskId, bytes: &[u8]) -> Result<()> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.insert(id.clone(), bytes.to_vec());
        Ok(())
    }

    fn list(&self) -> Result<Vec<TaskId>> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<TaskId> = data.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// One `<task_id>.json` per task under a results directory.
#[derive(Clone, Debug)]
pub struct FileTaskStorage {
    dir: PathBuf,
}

impl FileTaskStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| TaskError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &TaskId) -> PathBuf {
        self.dir.join(id.file_name())
    }
}

impl TaskStorage for FileTaskStorage {
    fn read(&self, id: &TaskId) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TaskError::io(path, e)),
        }
    }

    fn write(&self, id: &TaskId, bytes: &[u8]) -> Result<()> {
        write_atomic(&self.path_for(id), bytes)
    }

    fn list(&self) -> Result<Vec<TaskId>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| TaskError::io(&self.dir, e))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TaskError::io(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            if let Ok(id) = TaskId::parse(stem) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
