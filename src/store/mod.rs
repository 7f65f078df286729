mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn update_user(&self, user: &User) -> Result<()>;
    fn count_students(&self) -> Result<i64>;
    fn count_students_since(&self, since: DateTime<Utc>) -> Result<i64>;
    fn count_students_with_purchases(&self) -> Result<i64>;
    fn has_admin_user(&self) -> Result<bool>;

    // Teacher operations
    fn create_teacher(&self, teacher: &Teacher) -> Result<()>;
    fn get_teacher(&self, id: &str) -> Result<Option<Teacher>>;
    fn list_teachers(&self) -> Result<Vec<Teacher>>;
    fn update_teacher(&self, teacher: &Teacher) -> Result<()>;
    /// Cascade-deletes the teacher's notes in the same statement batch.
    fn delete_teacher(&self, id: &str) -> Result<bool>;
    fn count_teachers(&self) -> Result<i64>;
    fn top_teachers(&self, limit: i64) -> Result<Vec<Teacher>>;

    // Note operations
    /// Inserts a batch of notes for one teacher and bumps the teacher's
    /// notes_count by the batch size, all in a single transaction.
    fn create_notes(&self, notes: &[Note]) -> Result<()>;
    fn get_note(&self, id: &str) -> Result<Option<Note>>;
    /// All-notes listing, newest first. Catalog browsing order.
    fn list_notes(&self, subject: Option<&str>) -> Result<Vec<Note>>;
    /// By-teacher listing, oldest first. Chronological reading order.
    fn list_notes_by_teacher(&self, teacher_id: &str) -> Result<Vec<Note>>;
    fn update_note(&self, note: &Note) -> Result<()>;
    /// Deletes the note and decrements the owning teacher's notes_count in
    /// one transaction. Err(NotFound) if the note does not exist.
    fn delete_note(&self, id: &str) -> Result<()>;
    fn count_notes(&self) -> Result<i64>;
    fn count_teacher_notes(&self, teacher_id: &str) -> Result<i64>;

    // Purchase operations
    /// Atomic append-if-absent. Returns false when the grant already
    /// existed; at most one of two concurrent duplicate calls returns true.
    fn record_purchase(&self, user_id: &str, note_id: &str, price_paid: i64) -> Result<bool>;
    fn has_purchase(&self, user_id: &str, note_id: &str) -> Result<bool>;
    fn list_purchased_note_ids(&self, user_id: &str) -> Result<Vec<String>>;
    /// Purchased notes joined against live note rows; dangling grants are
    /// silently dropped.
    fn list_purchased_notes(&self, user_id: &str) -> Result<Vec<Note>>;
    /// Revenue over all grants at the notes' current prices. Grants whose
    /// note was deleted contribute nothing.
    fn total_revenue(&self) -> Result<i64>;
    fn top_students(&self, limit: i64) -> Result<Vec<(User, i64)>>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>>;
    fn touch_session(&self, id: &str, expires_at: DateTime<Utc>) -> Result<()>;
    fn delete_session(&self, id: &str) -> Result<bool>;
    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize>;

    fn close(&self) -> Result<()>;
}
