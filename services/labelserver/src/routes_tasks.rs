use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use labeling::{LabelSubmission, LabelingTask, TaskError, TaskId};

use crate::state::SharedState;
use crate::store_exec::with_store_blocking;

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

pub fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError { error: msg.into() }))
}

fn task_error(e: TaskError) -> (StatusCode, Json<ApiError>) {
    let status = match &e {
        TaskError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        TaskError::ShapeMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TaskError::InvalidTaskId(_) | TaskError::InvalidLabeler(_) => StatusCode::BAD_REQUEST,
        TaskError::TaskCorrupt { .. } | TaskError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "labeling store failure");
    }
    api_error(status, e.to_string())
}

fn join_error(e: tokio::task::JoinError) -> (StatusCode, Json<ApiError>) {
    tracing::error!(error = %e, "store task panicked");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "store task failed")
}

#[derive(Deserialize)]
pub struct GetTaskParams {
    pub taskid: String,
}

pub async fn get_task(
    State(state): State<SharedState>,
    Query(params): Query<GetTaskParams>,
) -> ApiResult<Json<LabelingTask>> {
    let id = TaskId::parse(&params.taskid).map_err(task_error)?;
    let task = with_store_blocking(state, move |store| store.get(&id))
        .await
        .map_err(join_error)?
        .map_err(task_error)?;
    Ok(Json(task))
}

#[derive(Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskId>,
}

pub async fn list_tasks(State(state): State<SharedState>) -> ApiResult<Json<TaskListResponse>> {
    let tasks = with_store_blocking(state, |store| store.list())
        .await
        .map_err(join_error)?
        .map_err(task_error)?;
    Ok(Json(TaskListResponse { tasks }))
}

#[derive(Deserialize)]
pub struct StoreLabelsRequest {
    pub task_id: String,
    pub labeler_name: String,
    pub labels: Vec<i32>,
    #[serde(default)]
    pub labeling_times: Option<Vec<f64>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreLabelsResponse {
    pub task_id: TaskId,
    pub labeler: String,
    pub num_labels: usize,
}

pub async fn store_labels(
    State(state): State<SharedState>,
    Json(req): Json<StoreLabelsRequest>,
) -> ApiResult<Json<StoreLabelsResponse>> {
    let submission = LabelSubmission {
        task_id: TaskId::parse(&req.task_id).map_err(task_error)?,
        labeler_name: req.labeler_name,
        labels: req.labels,
        labeling_times: req.labeling_times,
    };
    let task_id = submission.task_id.clone();
    let num_labels = submission.labels.len();

    let labeler = with_store_blocking(state, move |store| store.submit(&submission))
        .await
        .map_err(join_error)?
        .map_err(task_error)?;

    Ok(Json(StoreLabelsResponse { task_id, labeler, num_labels }))
}
