use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::content::MAX_UPLOAD_SIZE;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::router::AppState;
use crate::server::validation::validate_display_name;
use crate::types::Teacher;

#[derive(Default)]
struct TeacherForm {
    name: Option<String>,
    subject: Option<String>,
    description: Option<String>,
    photo: Option<String>,
}

/// Reads the teacher multipart form. The photo is stored inline as a
/// base64 data URL; teacher portraits are small and served with the row.
async fn read_teacher_form(mut multipart: Multipart) -> Result<TeacherForm, ApiError> {
    let mut form = TeacherForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Invalid multipart payload"))?
    {
        match field.name() {
            Some("name") => {
                form.name = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request("Invalid name field"))?,
                );
            }
            Some("subject") => {
                form.subject = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request("Invalid subject field"))?,
                );
            }
            Some("description") => {
                form.description = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request("Invalid description field"))?,
                );
            }
            Some("photo") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                if !content_type.starts_with("image/") {
                    return Err(ApiError::bad_request("Photo must be an image"));
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read photo"))?;
                if data.len() > MAX_UPLOAD_SIZE {
                    return Err(ApiError::payload_too_large("Photo is too large"));
                }

                form.photo = Some(format!(
                    "data:{content_type};base64,{}",
                    BASE64.encode(&data)
                ));
            }
            _ => {}
        }
    }

    Ok(form)
}

pub async fn create_teacher(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Teacher>>), ApiError> {
    let form = read_teacher_form(multipart).await?;

    let name = form
        .name
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Name is required"))?;
    let name = validate_display_name(name)?;

    let subject = form
        .subject
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Subject is required"))?;

    let teacher = Teacher {
        id: Uuid::new_v4().to_string(),
        name,
        subject,
        description: form.description.filter(|d| !d.trim().is_empty()),
        profile_image: form.photo,
        notes_count: 0,
        rating_average: 0.0,
        rating_count: 0,
        created_at: Utc::now(),
    };

    state
        .store
        .create_teacher(&teacher)
        .api_err("Failed to create teacher")?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Teacher created successfully",
            teacher,
        )),
    ))
}

pub async fn update_teacher(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Teacher>>, ApiError> {
    let mut teacher = state
        .store
        .get_teacher(&id)
        .api_err("Failed to load teacher")?
        .or_not_found("Teacher not found")?;

    let form = read_teacher_form(multipart).await?;

    if let Some(name) = form.name.as_deref() {
        teacher.name = validate_display_name(name)?;
    }
    if let Some(subject) = form.subject {
        let subject = subject.trim().to_string();
        if subject.is_empty() {
            return Err(ApiError::bad_request("Subject cannot be empty"));
        }
        teacher.subject = subject;
    }
    if let Some(description) = form.description {
        let description = description.trim().to_string();
        teacher.description = if description.is_empty() {
            None
        } else {
            Some(description)
        };
    }
    if form.photo.is_some() {
        teacher.profile_image = form.photo;
    }

    state
        .store
        .update_teacher(&teacher)
        .api_err("Failed to update teacher")?;

    Ok(Json(ApiResponse::with_message(
        "Teacher updated successfully",
        teacher,
    )))
}

pub async fn delete_teacher(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let deleted = state
        .store
        .delete_teacher(&id)
        .api_err("Failed to delete teacher")?;
    if !deleted {
        return Err(ApiError::not_found("Teacher not found"));
    }

    Ok(Json(ApiResponse::<()>::message_only(
        "Teacher and their notes deleted successfully",
    )))
}
