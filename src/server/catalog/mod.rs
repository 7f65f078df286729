//! Public catalog surface: teacher and note browsing, content delivery,
//! and the purchase endpoint.

mod notes;
mod teachers;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use super::router::AppState;

pub fn catalog_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/teachers", get(teachers::list_teachers))
        .route("/teachers/{id}", get(teachers::get_teacher))
        .route("/notes", get(notes::list_notes))
        .route("/notes/{id}", get(notes::get_note))
        .route("/notes/{id}/content", get(notes::get_note_content))
        .route("/notes/purchase/{id}", post(notes::purchase_note))
}
