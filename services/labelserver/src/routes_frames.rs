//! Read-only browsing of the frame tree: `<root>/<video>/<point>/<frame files>`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use axum::{
    extract::{Path as UrlPath, State},
    http::StatusCode,
    Json,
};

use crate::routes_tasks::{api_error, ApiError, ApiResult};
use crate::state::SharedState;

fn sub_dirs(path: &Path) -> io::Result<Vec<String>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with("__") {
            out.push(name);
        }
    }
    out.sort();
    Ok(out)
}

fn file_names(path: &Path) -> io::Result<Vec<String>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            out.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    out.sort();
    Ok(out)
}

/// Joins a client-supplied relative path onto `root`, refusing anything that
/// could climb out of it.
fn resolve(root: &Path, rel: &str) -> Option<PathBuf> {
    let rel = Path::new(rel);
    if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(root.join(rel))
}

fn io_error(e: io::Error) -> (StatusCode, Json<ApiError>) {
    match e.kind() {
        io::ErrorKind::NotFound => api_error(StatusCode::NOT_FOUND, "no such directory"),
        _ => {
            tracing::error!(error = %e, "frame listing failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn blocking<T: Send + 'static>(
    f: impl FnOnce() -> io::Result<T> + Send + 'static,
) -> ApiResult<T> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(io_error)
}

/// `{ video: [point dirs] }` for every video directory under the root.
pub async fn get_fs(State(state): State<SharedState>) -> ApiResult<Json<BTreeMap<String, Vec<String>>>> {
    let root = state.frames_root.clone();
    let tree = blocking(move || {
        let mut tree = BTreeMap::new();
        for video in sub_dirs(&root)? {
            let points = sub_dirs(&root.join(&video))?;
            tree.insert(video, points);
        }
        Ok(tree)
    })
    .await?;
    Ok(Json(tree))
}

pub async fn get_frames(
    State(state): State<SharedState>,
    UrlPath(dir): UrlPath<String>,
) -> ApiResult<Json<Vec<String>>> {
    let path = resolve(&state.frames_root, &dir).ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "invalid path"))?;
    let frames = blocking(move || file_names(&path)).await?;
    Ok(Json(frames))
}
