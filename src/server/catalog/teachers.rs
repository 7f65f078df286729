use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use crate::server::dto::TeacherWithNotes;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::router::AppState;
use crate::types::Teacher;

pub async fn list_teachers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Teacher>>>, ApiError> {
    let teachers = state
        .store
        .list_teachers()
        .api_err("Failed to load teachers")?;
    Ok(Json(ApiResponse::success(teachers)))
}

pub async fn get_teacher(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TeacherWithNotes>>, ApiError> {
    let teacher = state
        .store
        .get_teacher(&id)
        .api_err("Failed to load teacher")?
        .or_not_found("Teacher not found")?;

    // Oldest first: a teacher's page reads as a course, in upload order.
    let notes = state
        .store
        .list_notes_by_teacher(&teacher.id)
        .api_err("Failed to load notes")?;

    Ok(Json(ApiResponse::success(TeacherWithNotes {
        teacher,
        notes,
    })))
}
