use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use watermarker_core::{Task, TaskId};

use crate::{error::ApiResult, AppState};

/// Full task record view for status polling.
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = state.scheduler.status(TaskId::from(id))?;
    Ok(Json(task))
}
