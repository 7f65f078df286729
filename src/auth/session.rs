use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::store::Store;
use crate::types::{Session, User};

pub const COOKIE_NAME: &str = "notehall_session";

const TOKEN_PREFIX: &str = "notehall_s";
const SECRET_BYTES: usize = 16;

const SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Sliding session lifetime: each validated request pushes the expiry
/// this far into the future.
#[must_use]
pub fn session_ttl() -> Duration {
    Duration::seconds(SESSION_TTL_SECONDS)
}

/// What a request knows about its caller once the session checks out.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub session_id: String,
    pub user_id: String,
    /// Cached at login time. Admin routes re-check the user row instead of
    /// trusting this copy.
    pub is_admin: bool,
    pub name: String,
}

#[derive(Debug)]
pub enum SessionValidationError {
    InvalidToken,
    Expired,
    InternalError,
}

/// Generates a raw session token. Only its SHA-256 hash is stored; the raw
/// value goes into the cookie and is never seen again server-side.
fn generate_session_token() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    format!("{TOKEN_PREFIX}_{}", hex::encode(bytes))
}

#[must_use]
pub fn hash_session_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Creates a session row for a freshly authenticated user and returns it
/// along with the raw cookie token.
pub fn issue_session(store: &dyn Store, user: &User) -> crate::error::Result<(Session, String)> {
    let raw = generate_session_token();
    let now = Utc::now();

    let session = Session {
        id: Uuid::new_v4().to_string(),
        token_hash: hash_session_token(&raw),
        user_id: user.id.clone(),
        is_admin: user.is_admin,
        name: user.name.clone(),
        created_at: now,
        expires_at: now + session_ttl(),
        last_used_at: None,
    };

    store.create_session(&session)?;
    Ok((session, raw))
}

/// Validates a raw cookie token against the store: rejects unknown and
/// expired sessions, slides the expiry window on success.
pub fn validate_session(
    store: &dyn Store,
    raw: &str,
) -> Result<SessionIdentity, SessionValidationError> {
    let now = Utc::now();

    // Lazy purge; an expired row must never validate even if this fails.
    if let Err(e) = store.delete_expired_sessions(now) {
        tracing::warn!("Failed to purge expired sessions: {e}");
    }

    let session = store
        .get_session_by_token_hash(&hash_session_token(raw))
        .map_err(|_| SessionValidationError::InternalError)?
        .ok_or(SessionValidationError::InvalidToken)?;

    if session.expires_at < now {
        return Err(SessionValidationError::Expired);
    }

    if let Err(e) = store.touch_session(&session.id, now + session_ttl()) {
        tracing::warn!("Failed to refresh session expiry: {e}");
    }

    Ok(SessionIdentity {
        session_id: session.id,
        user_id: session.user_id,
        is_admin: session.is_admin,
        name: session.name,
    })
}

/// Set-Cookie value for a fresh session. HTTP-only: the session payload
/// lives server-side and the client only ever holds the opaque token.
#[must_use]
pub fn build_session_cookie(raw_token: &str) -> String {
    format!(
        "{COOKIE_NAME}={raw_token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_TTL_SECONDS
    )
}

/// Set-Cookie value that expires the session cookie on logout.
#[must_use]
pub fn clear_session_cookie() -> String {
    format!("{COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
