use std::path::PathBuf;
use std::sync::Arc;

use labeling::{FileTaskStorage, LabelingTaskStore};

pub type SharedState = Arc<AppState>;
pub type TaskStore = LabelingTaskStore<FileTaskStorage>;

pub struct AppState {
    pub store: TaskStore,
    /// Root of the video/frame directory tree served under /fs, /frames, /frame.
    pub frames_root: PathBuf,
}

impl AppState {
    pub fn new(results_dir: PathBuf, frames_root: PathBuf) -> labeling::Result<Self> {
        let storage = FileTaskStorage::new(results_dir)?;
        Ok(Self {
            store: LabelingTaskStore::new(storage),
            frames_root,
        })
    }
}
