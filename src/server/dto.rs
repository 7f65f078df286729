use serde::{Deserialize, Serialize};

use crate::types::{Note, Teacher, User};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeEmailRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub video_ref: Option<String>,
    #[serde(default)]
    pub video_kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListNotesParams {
    #[serde(default)]
    pub subject: Option<String>,
}

/// Public view of a user: everything except the credential hash, plus the
/// purchased-note id set.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: User,
    pub purchased_notes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TeacherWithNotes {
    #[serde(flatten)]
    pub teacher: Teacher,
    pub notes: Vec<Note>,
}

/// Note plus the viewer's entitlement, computed fresh per request. The
/// flag is a UI hint; enforcement happens again where content bytes are
/// actually served.
#[derive(Debug, Serialize)]
pub struct NoteWithAccess {
    #[serde(flatten)]
    pub note: Note,
    pub has_access: bool,
}

#[derive(Debug, Serialize)]
pub struct AdminOverview {
    pub total_students: i64,
    pub total_teachers: i64,
    pub total_notes: i64,
    pub active_students: i64,
    pub total_revenue: i64,
    pub new_students_this_week: i64,
}

#[derive(Debug, Serialize)]
pub struct TopStudent {
    pub id: String,
    pub name: String,
    pub email: String,
    pub purchase_count: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminAnalytics {
    pub overview: AdminOverview,
    pub top_teachers: Vec<Teacher>,
    pub top_students: Vec<TopStudent>,
}

#[derive(Debug, Serialize)]
pub struct StudentStats {
    pub purchased_notes: i64,
}

#[derive(Debug, Serialize)]
pub struct StudentAnalytics {
    pub stats: StudentStats,
    pub notes: Vec<Note>,
}
