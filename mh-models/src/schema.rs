//! Database schema definitions and table creation.
//!
//! Defines the SQLite schema for the five contact entities, translated to
//! relational tables with indexes on the lookup paths the services use.

use rusqlite::Connection;
use mh_core::error::{MhError, MhResult};
use tracing::info;

/// Create all database tables and indexes if they do not exist.
pub fn create_tables(conn: &Connection) -> MhResult<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| MhError::Database(format!("failed to create schema: {e}")))?;
    info!("database schema verified");
    Ok(())
}

/// Drop all tables (used for database reset).
pub fn drop_tables(conn: &Connection) -> MhResult<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS notifications;
         DROP TABLE IF EXISTS messages;
         DROP TABLE IF EXISTS conversations;
         DROP TABLE IF EXISTS contact_requests;
         DROP TABLE IF EXISTS contact_settings;
         DROP TABLE IF EXISTS schema_version;",
    )
    .map_err(|e| MhError::Database(format!("failed to drop tables: {e}")))?;
    Ok(())
}

/// Complete SQL schema for all tables.
const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- Per-user contact/privacy preferences (exactly one row per user)
CREATE TABLE IF NOT EXISTS contact_settings (
    id                      TEXT PRIMARY KEY,
    user_id                 TEXT NOT NULL UNIQUE,
    allow_contact_requests  INTEGER NOT NULL DEFAULT 1,
    allow_direct_messages   INTEGER NOT NULL DEFAULT 1,
    allow_meeting_requests  INTEGER NOT NULL DEFAULT 1,
    allow_investor_contact  INTEGER NOT NULL DEFAULT 1,
    allow_mentor_contact    INTEGER NOT NULL DEFAULT 1,
    allow_startup_contact   INTEGER NOT NULL DEFAULT 1,
    allow_student_contact   INTEGER NOT NULL DEFAULT 1,
    privacy_level           TEXT NOT NULL DEFAULT 'private',
    blocked_users           TEXT NOT NULL DEFAULT '[]',
    whitelisted_users       TEXT NOT NULL DEFAULT '[]',
    contact_preferences     TEXT,
    notification_settings   TEXT,
    business_hours          TEXT,
    timezone                TEXT NOT NULL DEFAULT 'UTC',
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contact_settings_user ON contact_settings(user_id);

-- Inbound contact requests
CREATE TABLE IF NOT EXISTS contact_requests (
    id                  TEXT PRIMARY KEY,
    requester_id        TEXT NOT NULL,
    requester_name      TEXT NOT NULL,
    requester_email     TEXT NOT NULL,
    requester_role      TEXT NOT NULL,
    target_id           TEXT NOT NULL,
    target_name         TEXT NOT NULL,
    target_email        TEXT NOT NULL,
    target_role         TEXT NOT NULL,
    request_type        TEXT NOT NULL,
    subject             TEXT NOT NULL,
    message             TEXT NOT NULL,
    status              TEXT NOT NULL DEFAULT 'pending',
    priority            TEXT NOT NULL DEFAULT 'medium',
    category            TEXT NOT NULL DEFAULT '',
    response_message    TEXT,
    responded_at        TEXT,
    responded_by        TEXT,
    scheduled_meeting   TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contact_requests_target ON contact_requests(target_id);
CREATE INDEX IF NOT EXISTS idx_contact_requests_status ON contact_requests(status);

-- 1:1 conversations with per-side counters and flags
CREATE TABLE IF NOT EXISTS conversations (
    id                      TEXT PRIMARY KEY,
    participant1_id         TEXT NOT NULL,
    participant1_name       TEXT NOT NULL,
    participant1_email      TEXT NOT NULL,
    participant1_role       TEXT NOT NULL,
    participant2_id         TEXT NOT NULL,
    participant2_name       TEXT NOT NULL,
    participant2_email      TEXT NOT NULL,
    participant2_role       TEXT NOT NULL,
    conversation_type       TEXT NOT NULL DEFAULT 'direct_message',
    status                  TEXT NOT NULL DEFAULT 'active',
    subject                 TEXT,
    last_message_at         TEXT,
    last_message_id         TEXT,
    last_message_content    TEXT,
    last_message_sender     TEXT,
    unread_count1           INTEGER NOT NULL DEFAULT 0,
    unread_count2           INTEGER NOT NULL DEFAULT 0,
    is_archived1            INTEGER NOT NULL DEFAULT 0,
    is_archived2            INTEGER NOT NULL DEFAULT 0,
    is_blocked1             INTEGER NOT NULL DEFAULT 0,
    is_blocked2             INTEGER NOT NULL DEFAULT 0,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_participant1 ON conversations(participant1_id);
CREATE INDEX IF NOT EXISTS idx_conversations_participant2 ON conversations(participant2_id);
CREATE INDEX IF NOT EXISTS idx_conversations_last_message_at ON conversations(last_message_at);

-- Messages (immutable after insert except read-state)
CREATE TABLE IF NOT EXISTS messages (
    id                  TEXT PRIMARY KEY,
    conversation_id     TEXT NOT NULL REFERENCES conversations(id),
    sender_id           TEXT NOT NULL,
    sender_name         TEXT NOT NULL,
    sender_email        TEXT NOT NULL,
    sender_role         TEXT NOT NULL,
    recipient_id        TEXT NOT NULL,
    recipient_name      TEXT NOT NULL,
    recipient_email     TEXT NOT NULL,
    recipient_role      TEXT NOT NULL,
    message_type        TEXT NOT NULL DEFAULT 'text',
    content             TEXT NOT NULL,
    is_read             INTEGER NOT NULL DEFAULT 0,
    read_at             TEXT,
    priority            TEXT NOT NULL DEFAULT 'medium',
    category            TEXT NOT NULL DEFAULT '',
    attachments         TEXT NOT NULL DEFAULT '[]',
    metadata            TEXT,
    created_at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);
CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at);
CREATE INDEX IF NOT EXISTS idx_messages_recipient_unread ON messages(recipient_id, is_read);

-- Per-user notification inbox
CREATE TABLE IF NOT EXISTS notifications (
    id                  TEXT PRIMARY KEY,
    user_id             TEXT NOT NULL,
    notification_type   TEXT NOT NULL,
    title               TEXT NOT NULL,
    message             TEXT NOT NULL,
    related_id          TEXT,
    related_type        TEXT,
    priority            TEXT NOT NULL DEFAULT 'medium',
    category            TEXT NOT NULL DEFAULT '',
    is_read             INTEGER NOT NULL DEFAULT 0,
    read_at             TEXT,
    action_required     INTEGER NOT NULL DEFAULT 0,
    action_url          TEXT,
    created_at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
CREATE INDEX IF NOT EXISTS idx_notifications_user_unread ON notifications(user_id, is_read);
"#;
