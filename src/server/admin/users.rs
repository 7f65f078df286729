use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{Duration, Utc};

use crate::auth::RequireAdmin;
use crate::server::dto::{AdminAnalytics, AdminOverview, TopStudent};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::router::AppState;
use crate::types::User;

const TOP_LIST_LIMIT: i64 = 5;

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    // Password hashes never serialize; the User serializer skips them.
    let users = state.store.list_users().api_err("Failed to load users")?;
    Ok(Json(ApiResponse::success(users)))
}

/// Dashboard rollup, computed on demand. Revenue is the sum of purchase
/// grants at each note's current price, so deleted notes drop out and
/// price changes are reflected retroactively.
pub async fn admin_stats(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<ApiResponse<AdminAnalytics>>, ApiError> {
    let store = state.store.as_ref();
    let week_ago = Utc::now() - Duration::days(7);

    let overview = AdminOverview {
        total_students: store.count_students().api_err("Failed to count students")?,
        total_teachers: store.count_teachers().api_err("Failed to count teachers")?,
        total_notes: store.count_notes().api_err("Failed to count notes")?,
        active_students: store
            .count_students_with_purchases()
            .api_err("Failed to count active students")?,
        total_revenue: store.total_revenue().api_err("Failed to compute revenue")?,
        new_students_this_week: store
            .count_students_since(week_ago)
            .api_err("Failed to count new students")?,
    };

    let top_teachers = store
        .top_teachers(TOP_LIST_LIMIT)
        .api_err("Failed to load top teachers")?;

    let top_students = store
        .top_students(TOP_LIST_LIMIT)
        .api_err("Failed to load top students")?
        .into_iter()
        .map(|(user, purchase_count)| TopStudent {
            id: user.id,
            name: user.name,
            email: user.email,
            purchase_count,
        })
        .collect();

    Ok(Json(ApiResponse::success(AdminAnalytics {
        overview,
        top_teachers,
        top_students,
    })))
}
