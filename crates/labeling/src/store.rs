use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::error::{Result, TaskError};
use crate::schema::{LabelSubmission, TaskId};
use crate::storage::TaskStorage;
use crate::task::LabelingTask;

/// Owns task records in a `TaskStorage`. Every mutation is a load-merge-save
/// cycle run under that task's lock, so two labelers submitting at once both
/// land.
pub struct LabelingTaskStore<S: TaskStorage> {
    storage: S,
    locks: Mutex<HashMap<TaskId, Arc<Mutex<()>>>>,
}

impl<S: TaskStorage> LabelingTaskStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage, locks: Mutex::new(HashMap::new()) }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Runs `f` holding the task's lock. The lock entry is dropped again once
    /// no other caller holds or waits on it, so the map only tracks tasks in
    /// use.
    fn with_task_lock<R>(&self, id: &TaskId, f: impl FnOnce() -> R) -> R {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(id.clone()).or_default().clone()
        };
        let out = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // one reference is the map's, one is ours
        let unused = locks.get(id).is_some_and(|l| Arc::ptr_eq(l, &lock)) && Arc::strong_count(&lock) == 2;
        if unused {
            locks.remove(id);
        }
        out
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn load(&self, id: &TaskId) -> Result<LabelingTask> {
        let bytes = self
            .storage
            .read(id)?
            .ok_or_else(|| TaskError::TaskNotFound(id.to_string()))?;
        let task = LabelingTask::from_json_slice(&bytes, id.as_str())?;
        if task.task_id() != id {
            return Err(TaskError::corrupt(id, format!("record holds task id {}", task.task_id())));
        }
        Ok(task)
    }

    fn store(&self, task: &LabelingTask) -> Result<()> {
        task.validate()?;
        self.storage.write(task.task_id(), &task.to_json_vec()?)
    }

    pub fn create(&self, task: &LabelingTask) -> Result<()> {
        self.with_task_lock(task.task_id(), || {
            if self.storage.read(task.task_id())?.is_some() {
                return Err(TaskError::TaskExists(task.task_id().to_string()));
            }
            self.store(task)
        })?;
        info!(
            task_id = %task.task_id(),
            datapoints = task.num_datapoints(),
            categories = task.categories().len(),
            "labeling task created"
        );
        Ok(())
    }

    pub fn get(&self, id: &TaskId) -> Result<LabelingTask> {
        self.with_task_lock(id, || self.load(id))
    }

    /// Writes the authoring fields of `task` (description, categories,
    /// datapoints) onto the stored record. Labeler results already stored are
    /// kept and the ones carried by `task` are ignored.
    pub fn save(&self, task: &LabelingTask) -> Result<()> {
        self.update(task.task_id(), |stored| stored.apply_authoring(task))
    }

    pub fn list(&self) -> Result<Vec<TaskId>> {
        self.storage.list()
    }

    /// Load, apply `f`, save, all under the task's lock. Nothing is written if
    /// `f` fails.
    pub fn update<R>(&self, id: &TaskId, f: impl FnOnce(&mut LabelingTask) -> Result<R>) -> Result<R> {
        self.with_task_lock(id, || {
            let mut task = self.load(id)?;
            let out = f(&mut task)?;
            self.store(&task)?;
            Ok(out)
        })
    }

    pub fn record_labeler_result(&self, id: &TaskId, labeler: &str, labels: Vec<i32>) -> Result<()> {
        self.update(id, |task| task.record_labeler_result(labeler, labels))
    }

    pub fn record_labeling_times(&self, id: &TaskId, labeler: &str, times: Vec<f64>) -> Result<()> {
        self.update(id, |task| task.record_labeling_times(labeler, times))
    }

    /// Returns the canonical labeler name the results were stored under.
    pub fn submit(&self, submission: &LabelSubmission) -> Result<String> {
        let labeler = self.update(&submission.task_id, |task| task.apply_submission(submission))?;
        info!(
            task_id = %submission.task_id,
            labeler = %labeler,
            labels = submission.labels.len(),
            with_times = submission.labeling_times.is_some(),
            "labels stored"
        );
        Ok(labeler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryTaskStorage;

    #[test]
    fn test_lock_map_only_tracks_tasks_in_use() {
        let store = LabelingTaskStore::new(InMemoryTaskStorage::new());
        for i in 0..1000 {
            let id = TaskId::parse(&format!("missing{i}")).unwrap();
            assert!(matches!(store.get(&id), Err(TaskError::TaskNotFound(_))));
        }
        assert_eq!(store.tracked_locks(), 0);

        let mut task = LabelingTask::new();
        task.set_datapoints(vec!["a.jpg".into()]).unwrap();
        store.create(&task).unwrap();
        store.record_labeler_result(task.task_id(), "bob", vec![1]).unwrap();
        assert_eq!(store.tracked_locks(), 0);
    }

    #[test]
    fn test_lock_entry_kept_while_held_elsewhere() {
        let store = LabelingTaskStore::new(InMemoryTaskStorage::new());
        let id = TaskId::parse("busy").unwrap();
        let held = {
            let mut locks = store.locks.lock().unwrap();
            locks.entry(id.clone()).or_default().clone()
        };

        let _ = store.get(&id);
        assert_eq!(store.tracked_locks(), 1);
        drop(held);
        let _ = store.get(&id);
        assert_eq!(store.tracked_locks(), 0);
    }
}
