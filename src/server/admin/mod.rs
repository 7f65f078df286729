//! Admin-only management surface under `/api/admin`. Every handler takes
//! [`RequireAdmin`], which re-checks the admin bit against the user row.

mod notes;
mod teachers;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use super::router::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(users::admin_stats))
        .route("/users", get(users::list_users))
        .route("/teachers", post(teachers::create_teacher))
        .route(
            "/teachers/{id}",
            put(teachers::update_teacher).delete(teachers::delete_teacher),
        )
        .route("/notes", post(notes::create_notes))
        .route(
            "/notes/{id}",
            put(notes::update_note).delete(notes::delete_note),
        )
}
