//! Registration, login, and account self-service routes under `/api/auth`.

use std::sync::Arc;

use axum::http::header::SET_COOKIE;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use uuid::Uuid;

use super::dto::{
    ChangeEmailRequest, ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest,
    UserResponse,
};
use super::response::{ApiError, ApiResponse, StoreResultExt, StoreOptionExt};
use super::router::AppState;
use super::validation::{normalize_email, validate_display_name, validate_email};
use crate::auth::{
    MIN_PASSWORD_LEN, PasswordHasher, RequireAuth, build_session_cookie, clear_session_cookie,
    issue_session,
};
use crate::types::User;

pub fn account_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/change-password", put(change_password))
        .route("/change-email", put(change_email))
        .route("/profile", put(update_profile))
}

fn user_response(state: &AppState, user: User) -> Result<UserResponse, ApiError> {
    let purchased_notes = state
        .store
        .list_purchased_note_ids(&user.id)
        .api_err("Failed to load purchases")?;
    Ok(UserResponse {
        user,
        purchased_notes,
    })
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    let name = validate_display_name(&req.name)?;
    let email = validate_email(&req.email)?;
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if state
        .store
        .get_user_by_email(&email)
        .api_err("Failed to check email")?
        .is_some()
    {
        return Err(ApiError::bad_request(
            "An account with this email already exists",
        ));
    }

    let password_hash = PasswordHasher::new()
        .hash(&req.password)
        .api_err("Failed to hash password")?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        password_hash,
        is_admin: false,
        profile_image: None,
        created_at: now,
        updated_at: now,
    };

    // A concurrent register with the same email loses the race here and
    // gets the same duplicate-email answer.
    match state.store.create_user(&user) {
        Ok(()) => {}
        Err(crate::error::Error::AlreadyExists) => {
            return Err(ApiError::bad_request(
                "An account with this email already exists",
            ));
        }
        Err(_) => return Err(ApiError::internal("Failed to create user")),
    }

    let (_, raw_token) = issue_session(state.store.as_ref(), &user)
        .api_err("Failed to create session")?;

    let body = ApiResponse::with_message("Registered successfully", user_response(&state, user)?);
    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, build_session_cookie(&raw_token))],
        Json(body),
    )
        .into_response())
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let email = normalize_email(&req.email);

    // One message for both unknown email and wrong password, so the
    // endpoint cannot be used to enumerate accounts.
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let user = state
        .store
        .get_user_by_email(&email)
        .api_err("Failed to look up user")?
        .ok_or_else(invalid)?;

    let ok = PasswordHasher::new()
        .verify(&req.password, &user.password_hash)
        .api_err("Failed to verify password")?;
    if !ok {
        return Err(invalid());
    }

    let (_, raw_token) = issue_session(state.store.as_ref(), &user)
        .api_err("Failed to create session")?;

    let body = ApiResponse::with_message("Logged in successfully", user_response(&state, user)?);
    Ok((
        StatusCode::OK,
        [(SET_COOKIE, build_session_cookie(&raw_token))],
        Json(body),
    )
        .into_response())
}

async fn logout(
    State(state): State<Arc<AppState>>,
    RequireAuth(identity): RequireAuth,
) -> Result<Response, ApiError> {
    state
        .store
        .delete_session(&identity.session_id)
        .api_err("Failed to delete session")?;

    let body = ApiResponse::<()>::message_only("Logged out successfully");
    Ok((
        StatusCode::OK,
        [(SET_COOKIE, clear_session_cookie())],
        Json(body),
    )
        .into_response())
}

async fn me(
    State(state): State<Arc<AppState>>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = state
        .store
        .get_user(&identity.user_id)
        .api_err("Failed to load user")?
        .or_not_found("User not found")?;

    Ok(Json(ApiResponse::success(user_response(&state, user)?)))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    RequireAuth(identity): RequireAuth,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    if req.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let mut user = state
        .store
        .get_user(&identity.user_id)
        .api_err("Failed to load user")?
        .or_not_found("User not found")?;

    let hasher = PasswordHasher::new();
    let ok = hasher
        .verify(&req.current_password, &user.password_hash)
        .api_err("Failed to verify password")?;
    if !ok {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    user.password_hash = hasher
        .hash(&req.new_password)
        .api_err("Failed to hash password")?;
    user.updated_at = Utc::now();
    state
        .store
        .update_user(&user)
        .api_err("Failed to update user")?;

    Ok(Json(ApiResponse::<()>::message_only(
        "Password changed successfully",
    )))
}

async fn change_email(
    State(state): State<Arc<AppState>>,
    RequireAuth(identity): RequireAuth,
    Json(req): Json<ChangeEmailRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let email = validate_email(&req.email)?;

    let mut user = state
        .store
        .get_user(&identity.user_id)
        .api_err("Failed to load user")?
        .or_not_found("User not found")?;

    let ok = PasswordHasher::new()
        .verify(&req.password, &user.password_hash)
        .api_err("Failed to verify password")?;
    if !ok {
        return Err(ApiError::unauthorized("Password is incorrect"));
    }

    user.email = email;
    user.updated_at = Utc::now();

    // The unique constraint is the authority; a concurrent claim of the
    // same address gets the duplicate answer either way.
    match state.store.update_user(&user) {
        Ok(()) => {}
        Err(crate::error::Error::AlreadyExists) => {
            return Err(ApiError::bad_request(
                "An account with this email already exists",
            ));
        }
        Err(_) => return Err(ApiError::internal("Failed to update user")),
    }

    Ok(Json(ApiResponse::with_message(
        "Email changed successfully",
        user_response(&state, user)?,
    )))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    RequireAuth(identity): RequireAuth,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let mut user = state
        .store
        .get_user(&identity.user_id)
        .api_err("Failed to load user")?
        .or_not_found("User not found")?;

    if let Some(name) = req.name.as_deref() {
        user.name = validate_display_name(name)?;
    }
    if let Some(image) = req.profile_image {
        user.profile_image = if image.is_empty() { None } else { Some(image) };
    }
    user.updated_at = Utc::now();

    state
        .store
        .update_user(&user)
        .api_err("Failed to update user")?;

    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully",
        user_response(&state, user)?,
    )))
}
