use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    pub name: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    /// Denormalized count of live notes owned by this teacher. Adjusted in
    /// the same transaction as every note insert/delete.
    pub notes_count: i64,
    pub rating_average: f64,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Kind of payload a note's content reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Pdf,
    Image,
}

impl ContentKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pdf" => Some(Self::Pdf),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    /// Copied from the owning teacher at creation time, not a live join.
    pub subject: String,
    pub teacher_id: String,
    #[serde(skip)]
    pub content_ref: String,
    pub content_kind: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_kind: Option<String>,
    pub price: i64,
    /// Invariant: always equals `price > 0`.
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

/// An irreversible entitlement grant: once recorded, no operation removes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub user_id: String,
    pub note_id: String,
    /// Price at grant time, kept for audit. Revenue rollups use the note's
    /// current price instead.
    pub price_paid: i64,
    pub created_at: DateTime<Utc>,
}

/// Server-side session record. The cookie carries only the opaque raw
/// token; everything else lives here.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub token_hash: String,
    pub user_id: String,
    /// Cached from the user row at login time. Admin routes re-check the
    /// user row; this copy is a hint only.
    pub is_admin: bool,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Receipt returned by a successful purchase. No payment capture happens
/// in this system; the receipt only documents the entitlement grant.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub note_id: String,
    pub title: String,
    pub price: i64,
}
