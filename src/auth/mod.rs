mod middleware;
mod password;
mod session;

pub use middleware::{OptionalSession, RequireAdmin, RequireAuth};
pub use password::{MIN_PASSWORD_LEN, PasswordHasher};
pub use session::{
    COOKIE_NAME, SessionIdentity, SessionValidationError, build_session_cookie,
    clear_session_cookie, hash_session_token, issue_session, session_ttl, validate_session,
};
