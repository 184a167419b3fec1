use crate::state::{SharedState, TaskStore};

/// Runs `f` on the blocking pool: store calls do file IO and hold per-task
/// locks.
pub async fn with_store_blocking<R, F>(state: SharedState, f: F) -> Result<R, tokio::task::JoinError>
where
    R: Send + 'static,
    F: FnOnce(&TaskStore) -> R + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state.store)).await
}
