use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::content::{ContentStorageError, MAX_UPLOAD_SIZE};
use crate::error::Error;
use crate::server::dto::UpdateNoteRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::router::AppState;
use crate::server::validation::{validate_price, validate_title};
use crate::types::{ContentKind, Note};

struct UploadedFile {
    data: Vec<u8>,
    content_type: String,
}

#[derive(Default)]
struct NoteBatchForm {
    teacher_id: Option<String>,
    title: Option<String>,
    price: Option<i64>,
    video_ref: Option<String>,
    video_kind: Option<String>,
    files: Vec<UploadedFile>,
}

async fn read_note_batch_form(mut multipart: Multipart) -> Result<NoteBatchForm, ApiError> {
    let mut form = NoteBatchForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Invalid multipart payload"))?
    {
        match field.name() {
            Some("teacher_id") => {
                form.teacher_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request("Invalid teacher_id field"))?,
                );
            }
            Some("title") => {
                form.title = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request("Invalid title field"))?,
                );
            }
            Some("price") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid price field"))?;
                let price = text
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ApiError::bad_request("Price must be a whole number"))?;
                form.price = Some(price);
            }
            Some("video_ref") => {
                form.video_ref = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request("Invalid video_ref field"))?,
                );
            }
            Some("video_kind") => {
                form.video_kind = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request("Invalid video_kind field"))?,
                );
            }
            Some("files") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read file"))?;
                if data.len() > MAX_UPLOAD_SIZE {
                    return Err(ApiError::payload_too_large("File is too large"));
                }

                form.files.push(UploadedFile {
                    data: data.to_vec(),
                    content_type,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Creates one note per uploaded file, all sharing title, price, and
/// teacher. The inserts and the notes_count bump happen in one store
/// transaction, so a failure leaves the count untouched.
pub async fn create_notes(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Note>>>), ApiError> {
    let form = read_note_batch_form(multipart).await?;

    let teacher_id = form
        .teacher_id
        .ok_or_else(|| ApiError::bad_request("teacher_id is required"))?;
    let title = form
        .title
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Title is required"))?;
    let title = validate_title(title)?;
    let price = validate_price(
        form.price
            .ok_or_else(|| ApiError::bad_request("Price is required"))?,
    )?;
    if form.files.is_empty() {
        return Err(ApiError::bad_request("At least one file is required"));
    }

    let teacher = state
        .store
        .get_teacher(&teacher_id)
        .api_err("Failed to load teacher")?
        .or_not_found("Teacher not found")?;

    let now = Utc::now();
    let mut notes = Vec::with_capacity(form.files.len());
    for file in &form.files {
        let content_ref = state
            .content
            .store(&file.data, &file.content_type)
            .await
            .map_err(|e| match e {
                ContentStorageError::UnsupportedContentType(t) => {
                    ApiError::bad_request(format!("Unsupported content type: {t}"))
                }
                ContentStorageError::TooLarge(_) => {
                    ApiError::payload_too_large("File is too large")
                }
                _ => ApiError::internal("Failed to store file"),
            })?;

        let content_kind = if file.content_type == "application/pdf" {
            ContentKind::Pdf
        } else {
            ContentKind::Image
        };

        notes.push(Note {
            id: Uuid::new_v4().to_string(),
            title: title.clone(),
            subject: teacher.subject.clone(),
            teacher_id: teacher.id.clone(),
            content_ref: content_ref.encode(),
            content_kind,
            video_ref: form.video_ref.clone().filter(|v| !v.trim().is_empty()),
            video_kind: form.video_kind.clone().filter(|v| !v.trim().is_empty()),
            price,
            is_paid: price > 0,
            created_at: now,
        });
    }

    match state.store.create_notes(&notes) {
        Ok(()) => {}
        Err(Error::NotFound) => return Err(ApiError::not_found("Teacher not found")),
        Err(_) => return Err(ApiError::internal("Failed to create notes")),
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            format!("{} note(s) created successfully", notes.len()),
            notes,
        )),
    ))
}

pub async fn update_note(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<String>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<ApiResponse<Note>>, ApiError> {
    let mut note = state
        .store
        .get_note(&id)
        .api_err("Failed to load note")?
        .or_not_found("Note not found")?;

    if let Some(title) = req.title.as_deref() {
        note.title = validate_title(title)?;
    }
    if let Some(subject) = req.subject {
        let subject = subject.trim().to_string();
        if subject.is_empty() {
            return Err(ApiError::bad_request("Subject cannot be empty"));
        }
        note.subject = subject;
    }
    if let Some(price) = req.price {
        note.price = validate_price(price)?;
        // is_paid tracks the price, never set independently.
        note.is_paid = note.price > 0;
    }
    if let Some(video_ref) = req.video_ref {
        note.video_ref = Some(video_ref).filter(|v| !v.trim().is_empty());
    }
    if let Some(video_kind) = req.video_kind {
        note.video_kind = Some(video_kind).filter(|v| !v.trim().is_empty());
    }

    state
        .store
        .update_note(&note)
        .api_err("Failed to update note")?;

    Ok(Json(ApiResponse::with_message(
        "Note updated successfully",
        note,
    )))
}

pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    match state.store.delete_note(&id) {
        Ok(()) => Ok(Json(ApiResponse::<()>::message_only(
            "Note deleted successfully",
        ))),
        Err(Error::NotFound) => Err(ApiError::not_found("Note not found")),
        Err(_) => Err(ApiError::internal("Failed to delete note")),
    }
}
