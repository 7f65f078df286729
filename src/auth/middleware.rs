use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::COOKIE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::session::{COOKIE_NAME, SessionIdentity, SessionValidationError, validate_session};
use crate::server::AppState;

/// Extractor that requires a valid, unexpired session.
pub struct RequireAuth(pub SessionIdentity);

/// Extractor that requires a valid session belonging to an admin. The admin
/// bit is re-checked against the current user row, so revoking it takes
/// effect on the next request without a re-login.
pub struct RequireAdmin(pub SessionIdentity);

/// Extractor that yields the session if one is present and valid, and
/// `None` otherwise. Never rejects a request for a missing cookie.
pub struct OptionalSession(pub Option<SessionIdentity>);

#[derive(Debug)]
pub enum AuthError {
    MissingSession,
    InvalidSession,
    SessionExpired,
    NotAdmin,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingSession => {
                (StatusCode::UNAUTHORIZED, "Unauthorized. Please login first.")
            }
            AuthError::InvalidSession => (StatusCode::UNAUTHORIZED, "Invalid session"),
            AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "Session expired"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Forbidden. Admin access required."),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "message": message });

        (status, Json(body)).into_response()
    }
}

/// Pulls the session cookie value out of the Cookie header, if any.
fn extract_session_cookie(parts: &Parts) -> Option<String> {
    let prefix = format!("{COOKIE_NAME}=");

    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(prefix.as_str()))
        .map(ToString::to_string)
}

fn resolve_session(parts: &Parts, state: &Arc<AppState>) -> Result<SessionIdentity, AuthError> {
    let raw = extract_session_cookie(parts).ok_or(AuthError::MissingSession)?;

    validate_session(state.store.as_ref(), &raw).map_err(|e| match e {
        SessionValidationError::InvalidToken => AuthError::InvalidSession,
        SessionValidationError::Expired => AuthError::SessionExpired,
        SessionValidationError::InternalError => AuthError::InternalError,
    })
}

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = resolve_session(parts, state)?;
        Ok(RequireAuth(identity))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = resolve_session(parts, state)?;

        // The session caches is_admin from login time; the user row is the
        // source of truth for the authorization decision.
        let user = state
            .store
            .get_user(&identity.user_id)
            .map_err(|_| AuthError::InternalError)?
            .ok_or(AuthError::InvalidSession)?;

        if !user.is_admin {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin(identity))
    }
}

impl FromRequestParts<Arc<AppState>> for OptionalSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(raw) = extract_session_cookie(parts) else {
            return Ok(OptionalSession(None));
        };

        // A stale or invalid cookie downgrades to anonymous rather than
        // failing a public route.
        match validate_session(state.store.as_ref(), &raw) {
            Ok(identity) => Ok(OptionalSession(Some(identity))),
            Err(SessionValidationError::InvalidToken | SessionValidationError::Expired) => {
                Ok(OptionalSession(None))
            }
            Err(SessionValidationError::InternalError) => Err(AuthError::InternalError),
        }
    }
}
