//! HTTP surface for labeling tasks and frame browsing.

pub mod config;
pub mod routes_frames;
pub mod routes_tasks;
pub mod state;
pub mod store_exec;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use state::{AppState, SharedState};

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "module": "labelserver" }))
}

pub fn build_router(state: SharedState) -> Router {
    let frames = ServeDir::new(&state.frames_root);

    Router::new()
        .route("/health", get(health))
        .route("/labeling_api/get_task", get(routes_tasks::get_task))
        .route("/labeling_api/store_labels", post(routes_tasks::store_labels))
        .route("/labeling_api/tasks", get(routes_tasks::list_tasks))
        .route("/fs", get(routes_frames::get_fs))
        .route("/frames/*dir", get(routes_frames::get_frames))
        .nest_service("/frame", frames)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
