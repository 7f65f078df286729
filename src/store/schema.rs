pub const SCHEMA: &str = r#"
-- Users hold credentials and the purchased-note entitlement set
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,         -- stored trimmed + lowercased
    password_hash TEXT NOT NULL,        -- argon2id hash with embedded salt
    is_admin INTEGER NOT NULL DEFAULT 0,
    profile_image TEXT,                 -- inline data URL
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Teachers own notes
CREATE TABLE IF NOT EXISTS teachers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    subject TEXT NOT NULL,
    description TEXT,
    profile_image TEXT,

    -- Denormalized: must equal the live count of notes referencing this
    -- teacher. Maintained in the same transaction as note inserts/deletes.
    notes_count INTEGER NOT NULL DEFAULT 0,

    rating_average REAL NOT NULL DEFAULT 0,
    rating_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Notes. Deleting a teacher cascades here, leaving no orphans.
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    subject TEXT NOT NULL,              -- copied from the teacher at creation
    teacher_id TEXT NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
    content_ref TEXT NOT NULL,
    content_kind TEXT NOT NULL DEFAULT 'image',  -- 'pdf' | 'image'
    video_ref TEXT,
    video_kind TEXT,
    price INTEGER NOT NULL DEFAULT 0 CHECK (price >= 0),
    is_paid INTEGER NOT NULL DEFAULT 0, -- always equals price > 0
    created_at TEXT DEFAULT (datetime('now'))
);

-- Purchases are append-only entitlement grants. note_id intentionally has
-- no foreign key: a grant may outlive its note, and access checks must
-- treat a missing note as not-found rather than blocking the delete.
CREATE TABLE IF NOT EXISTS purchases (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    note_id TEXT NOT NULL,
    price_paid INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, note_id)
);

-- Server-side sessions; the cookie holds only the raw token
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,           -- sha256 hex of the raw cookie token
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    is_admin INTEGER NOT NULL DEFAULT 0,  -- cached at login; admin routes re-check
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT NOT NULL,
    last_used_at TEXT
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_notes_teacher ON notes(teacher_id);
CREATE INDEX IF NOT EXISTS idx_notes_subject ON notes(subject);
CREATE INDEX IF NOT EXISTS idx_purchases_note ON purchases(note_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_token ON sessions(token_hash);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
"#;
