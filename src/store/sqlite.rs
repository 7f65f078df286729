use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_content_kind(s: &str) -> ContentKind {
    ContentKind::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid content kind in database: '{}'", s);
        ContentKind::Image
    })
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, is_admin, profile_image, created_at, updated_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        is_admin: row.get(4)?,
        profile_image: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

const TEACHER_COLUMNS: &str =
    "id, name, subject, description, profile_image, notes_count, rating_average, rating_count, created_at";

fn map_teacher(row: &Row<'_>) -> rusqlite::Result<Teacher> {
    Ok(Teacher {
        id: row.get(0)?,
        name: row.get(1)?,
        subject: row.get(2)?,
        description: row.get(3)?,
        profile_image: row.get(4)?,
        notes_count: row.get(5)?,
        rating_average: row.get(6)?,
        rating_count: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

const NOTE_COLUMNS: &str =
    "id, title, subject, teacher_id, content_ref, content_kind, video_ref, video_kind, price, is_paid, created_at";

fn map_note(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        subject: row.get(2)?,
        teacher_id: row.get(3)?,
        content_ref: row.get(4)?,
        content_kind: parse_content_kind(&row.get::<_, String>(5)?),
        video_ref: row.get(6)?,
        video_kind: row.get(7)?,
        price: row.get(8)?,
        is_paid: row.get(9)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

const SESSION_COLUMNS: &str =
    "id, token_hash, user_id, is_admin, name, created_at, expires_at, last_used_at";

fn map_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        user_id: row.get(2)?,
        is_admin: row.get(3)?,
        name: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: parse_datetime(&row.get::<_, String>(6)?),
        last_used_at: row
            .get::<_, Option<String>>(7)?
            .map(|s| parse_datetime(&s)),
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, name, email, password_hash, is_admin, profile_image, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                user.name,
                user.email,
                user.password_hash,
                user.is_admin,
                user.profile_image,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            map_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            map_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid"))?;

        let rows = stmt.query_map([], map_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE users SET name = ?1, email = ?2, password_hash = ?3, is_admin = ?4,
             profile_image = ?5, updated_at = ?6 WHERE id = ?7",
            params![
                user.name,
                user.email,
                user.password_hash,
                user.is_admin,
                user.profile_image,
                format_datetime(&user.updated_at),
                user.id,
            ],
        );

        match result {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn count_students(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM users WHERE is_admin = 0",
            [],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn count_students_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM users WHERE is_admin = 0 AND created_at >= ?1",
            params![format_datetime(&since)],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn count_students_with_purchases(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(DISTINCT p.user_id) FROM purchases p
             JOIN users u ON u.id = p.user_id WHERE u.is_admin = 0",
            [],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn has_admin_user(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Teacher operations

    fn create_teacher(&self, teacher: &Teacher) -> Result<()> {
        self.conn().execute(
            "INSERT INTO teachers (id, name, subject, description, profile_image, notes_count,
             rating_average, rating_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                teacher.id,
                teacher.name,
                teacher.subject,
                teacher.description,
                teacher.profile_image,
                teacher.notes_count,
                teacher.rating_average,
                teacher.rating_count,
                format_datetime(&teacher.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_teacher(&self, id: &str) -> Result<Option<Teacher>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TEACHER_COLUMNS} FROM teachers WHERE id = ?1"),
            params![id],
            map_teacher,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_teachers(&self) -> Result<Vec<Teacher>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TEACHER_COLUMNS} FROM teachers ORDER BY created_at DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map([], map_teacher)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_teacher(&self, teacher: &Teacher) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE teachers SET name = ?1, subject = ?2, description = ?3, profile_image = ?4
             WHERE id = ?5",
            params![
                teacher.name,
                teacher.subject,
                teacher.description,
                teacher.profile_image,
                teacher.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_teacher(&self, id: &str) -> Result<bool> {
        // Notes cascade via the foreign key; nothing can observe a teacher
        // without its notes_count or notes without their teacher.
        let rows = self
            .conn()
            .execute("DELETE FROM teachers WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn count_teachers(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM teachers", [], |row| row.get(0))
            .map_err(Error::from)
    }

    fn top_teachers(&self, limit: i64) -> Result<Vec<Teacher>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TEACHER_COLUMNS} FROM teachers
             ORDER BY rating_average DESC, rowid ASC LIMIT ?1"
        ))?;

        let rows = stmt.query_map(params![limit], map_teacher)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Note operations

    fn create_notes(&self, notes: &[Note]) -> Result<()> {
        let Some(first) = notes.first() else {
            return Ok(());
        };

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        for note in notes {
            tx.execute(
                "INSERT INTO notes (id, title, subject, teacher_id, content_ref, content_kind,
                 video_ref, video_kind, price, is_paid, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    note.id,
                    note.title,
                    note.subject,
                    note.teacher_id,
                    note.content_ref,
                    note.content_kind.as_str(),
                    note.video_ref,
                    note.video_kind,
                    note.price,
                    note.is_paid,
                    format_datetime(&note.created_at),
                ],
            )?;
        }

        // Atomic increment, never a read-modify-write pair.
        let rows = tx.execute(
            "UPDATE teachers SET notes_count = notes_count + ?1 WHERE id = ?2",
            params![notes.len() as i64, first.teacher_id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }

        tx.commit()?;
        Ok(())
    }

    fn get_note(&self, id: &str) -> Result<Option<Note>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
            params![id],
            map_note,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_notes(&self, subject: Option<&str>) -> Result<Vec<Note>> {
        let conn = self.conn();

        // Newest first: catalog browsing order.
        if let Some(subject) = subject {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes WHERE subject = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map(params![subject], map_note)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map([], map_note)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        }
    }

    fn list_notes_by_teacher(&self, teacher_id: &str) -> Result<Vec<Note>> {
        let conn = self.conn();

        // Oldest first: chronological reading order.
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE teacher_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![teacher_id], map_note)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_note(&self, note: &Note) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE notes SET title = ?1, subject = ?2, price = ?3, is_paid = ?4,
             video_ref = ?5, video_kind = ?6 WHERE id = ?7",
            params![
                note.title,
                note.subject,
                note.price,
                note.is_paid,
                note.video_ref,
                note.video_kind,
                note.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_note(&self, id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let teacher_id: Option<String> = tx
            .query_row(
                "SELECT teacher_id FROM notes WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(teacher_id) = teacher_id else {
            return Err(Error::NotFound);
        };

        tx.execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        tx.execute(
            "UPDATE teachers SET notes_count = notes_count - 1 WHERE id = ?1",
            params![teacher_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn count_notes(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .map_err(Error::from)
    }

    fn count_teacher_notes(&self, teacher_id: &str) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE teacher_id = ?1",
            params![teacher_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    // Purchase operations

    fn record_purchase(&self, user_id: &str, note_id: &str, price_paid: i64) -> Result<bool> {
        // Single conditional insert: of two concurrent duplicate purchases,
        // exactly one observes rows == 1.
        let rows = self.conn().execute(
            "INSERT INTO purchases (user_id, note_id, price_paid, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, note_id) DO NOTHING",
            params![user_id, note_id, price_paid, format_datetime(&Utc::now())],
        )?;
        Ok(rows > 0)
    }

    fn has_purchase(&self, user_id: &str, note_id: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM purchases WHERE user_id = ?1 AND note_id = ?2",
            params![user_id, note_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_purchased_note_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT note_id FROM purchases WHERE user_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_purchased_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM purchases p JOIN notes n ON n.id = p.note_id
             WHERE p.user_id = ?1 ORDER BY p.created_at ASC, p.rowid ASC",
            NOTE_COLUMNS
                .split(", ")
                .map(|c| format!("n.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        ))?;

        let rows = stmt.query_map(params![user_id], map_note)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn total_revenue(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COALESCE(SUM(n.price), 0) FROM purchases p
             JOIN notes n ON n.id = p.note_id
             JOIN users u ON u.id = p.user_id
             WHERE u.is_admin = 0",
            [],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn top_students(&self, limit: i64) -> Result<Vec<(User, i64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, COUNT(p.note_id) AS purchase_count FROM users u
             LEFT JOIN purchases p ON p.user_id = u.id
             WHERE u.is_admin = 0
             GROUP BY u.id
             ORDER BY purchase_count DESC, u.rowid ASC LIMIT ?1",
            USER_COLUMNS
                .split(", ")
                .map(|c| format!("u.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        ))?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok((map_user(row)?, row.get::<_, i64>(8)?))
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (id, token_hash, user_id, is_admin, name, created_at, expires_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session.id,
                session.token_hash,
                session.user_id,
                session.is_admin,
                session.name,
                format_datetime(&session.created_at),
                format_datetime(&session.expires_at),
                session.last_used_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_session_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE token_hash = ?1"),
            params![token_hash],
            map_session,
        )
        .optional()
        .map_err(Error::from)
    }

    fn touch_session(&self, id: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.conn().execute(
            "UPDATE sessions SET expires_at = ?1, last_used_at = ?2 WHERE id = ?3",
            params![
                format_datetime(&expires_at),
                format_datetime(&Utc::now()),
                id
            ],
        )?;
        Ok(())
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![format_datetime(&now)],
        )?;
        Ok(rows)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
