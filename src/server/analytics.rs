//! Per-student analytics under `/api/analytics`.

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};

use crate::auth::RequireAuth;
use crate::server::dto::{StudentAnalytics, StudentStats};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::router::AppState;

pub fn analytics_router() -> Router<Arc<AppState>> {
    Router::new().route("/student", get(student_analytics))
}

async fn student_analytics(
    State(state): State<Arc<AppState>>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<ApiResponse<StudentAnalytics>>, ApiError> {
    // Joined against live note rows; grants whose note was deleted since
    // purchase are not shown.
    let notes = state
        .store
        .list_purchased_notes(&identity.user_id)
        .api_err("Failed to load purchased notes")?;

    Ok(Json(ApiResponse::success(StudentAnalytics {
        stats: StudentStats {
            purchased_notes: notes.len() as i64,
        },
        notes,
    })))
}
