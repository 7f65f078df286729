use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::auth::{OptionalSession, RequireAuth};
use crate::entitlement;
use crate::error::Error;
use crate::server::dto::{ListNotesParams, NoteWithAccess};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::router::AppState;
use crate::types::Receipt;

pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    OptionalSession(identity): OptionalSession,
    Query(params): Query<ListNotesParams>,
) -> Result<Json<ApiResponse<Vec<NoteWithAccess>>>, ApiError> {
    let notes = state
        .store
        .list_notes(params.subject.as_deref())
        .api_err("Failed to load notes")?;

    // One purchases fetch for the whole page instead of a lookup per note.
    let owned: HashSet<String> = match identity.as_ref() {
        Some(identity) => state
            .store
            .list_purchased_note_ids(&identity.user_id)
            .api_err("Failed to load purchases")?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    let notes = notes
        .into_iter()
        .map(|note| {
            let has_access = !note.is_paid || owned.contains(&note.id);
            NoteWithAccess { note, has_access }
        })
        .collect();

    Ok(Json(ApiResponse::success(notes)))
}

pub async fn get_note(
    State(state): State<Arc<AppState>>,
    OptionalSession(identity): OptionalSession,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<NoteWithAccess>>, ApiError> {
    let note = state
        .store
        .get_note(&id)
        .api_err("Failed to load note")?
        .or_not_found("Note not found")?;

    let viewer_id = identity.as_ref().map(|i| i.user_id.as_str());
    let decision = entitlement::check_access(state.store.as_ref(), viewer_id, &note)
        .api_err("Failed to check access")?;

    Ok(Json(ApiResponse::success(NoteWithAccess {
        note,
        has_access: decision.is_granted(),
    })))
}

/// Serves the note's payload bytes. This is the enforcement point: access
/// is re-checked against the store here regardless of what any listing
/// previously reported.
pub async fn get_note_content(
    State(state): State<Arc<AppState>>,
    OptionalSession(identity): OptionalSession,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let note = state
        .store
        .get_note(&id)
        .api_err("Failed to load note")?
        .or_not_found("Note not found")?;

    let viewer_id = identity.as_ref().map(|i| i.user_id.as_str());
    let decision = entitlement::check_access(state.store.as_ref(), viewer_id, &note)
        .api_err("Failed to check access")?;

    if !decision.is_granted() {
        // Anonymous viewers are asked to log in; authenticated viewers
        // without a grant are refused outright.
        return Err(match identity {
            None => ApiError::unauthorized("Please login to access this note"),
            Some(_) => ApiError::forbidden("Purchase this note to access its content"),
        });
    }

    let (data, content_type) = state
        .content
        .resolve(&note.content_ref)
        .await
        .map_err(|_| ApiError::internal("Failed to load note content"))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        data,
    )
        .into_response())
}

pub async fn purchase_note(
    State(state): State<Arc<AppState>>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Receipt>>, ApiError> {
    let receipt = entitlement::purchase(state.store.as_ref(), &identity.user_id, &id).map_err(
        |e| match e {
            Error::NotFound => ApiError::not_found("Note not found"),
            Error::AlreadyOwned => ApiError::bad_request("You have already purchased this note"),
            _ => ApiError::internal("Failed to record purchase"),
        },
    )?;

    Ok(Json(ApiResponse::with_message(
        "Purchase successful",
        receipt,
    )))
}
