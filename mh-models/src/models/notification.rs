//! Notification entity model.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use mh_core::error::{MhError, MhResult};

use super::common::Priority;

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewContactRequest,
    ContactApproved,
    ContactRejected,
    NewMessage,
    MeetingRequest,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::NewContactRequest => "new_contact_request",
            NotificationType::ContactApproved => "contact_approved",
            NotificationType::ContactRejected => "contact_rejected",
            NotificationType::NewMessage => "new_message",
            NotificationType::MeetingRequest => "meeting_request",
            NotificationType::System => "system",
        }
    }

    /// Parse a stored string; unrecognized values map to System.
    pub fn parse(s: &str) -> Self {
        match s {
            "new_contact_request" => NotificationType::NewContactRequest,
            "contact_approved" => NotificationType::ContactApproved,
            "contact_rejected" => NotificationType::ContactRejected,
            "new_message" => NotificationType::NewMessage,
            "meeting_request" => NotificationType::MeetingRequest,
            _ => NotificationType::System,
        }
    }
}

/// An entry in a user's notification inbox. Immutable after insert except
/// for the read-state fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactNotification {
    pub id: String,
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<String>,
    pub related_type: Option<String>,
    pub priority: Priority,
    pub category: String,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub action_required: bool,
    pub action_url: Option<String>,
    pub created_at: String,
}

impl ContactNotification {
    /// Construct from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            notification_type: NotificationType::parse(
                &row.get::<_, String>("notification_type")?,
            ),
            title: row.get("title")?,
            message: row.get("message")?,
            related_id: row.get("related_id")?,
            related_type: row.get("related_type")?,
            priority: Priority::parse(&row.get::<_, String>("priority")?),
            category: row.get("category")?,
            is_read: row.get::<_, i32>("is_read")? != 0,
            read_at: row.get("read_at")?,
            action_required: row.get::<_, i32>("action_required")? != 0,
            action_url: row.get("action_url")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Insert this notification.
    pub fn insert(&self, conn: &Connection) -> MhResult<()> {
        conn.execute(
            "INSERT INTO notifications (
                id, user_id, notification_type, title, message, related_id,
                related_type, priority, category, is_read, read_at,
                action_required, action_url, created_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                self.id,
                self.user_id,
                self.notification_type.as_str(),
                self.title,
                self.message,
                self.related_id,
                self.related_type,
                self.priority.as_str(),
                self.category,
                self.is_read as i32,
                self.read_at,
                self.action_required as i32,
                self.action_url,
                self.created_at,
            ],
        )
        .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(())
    }

    /// Write back the read-state, the only mutable part of a notification.
    pub fn update_read_state(&self, conn: &Connection) -> MhResult<()> {
        conn.execute(
            "UPDATE notifications SET is_read = ?1, read_at = ?2 WHERE id = ?3",
            params![self.is_read as i32, self.read_at, self.id],
        )
        .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Input for dispatching a notification. The id, unread state, and
/// timestamp are assigned on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub related_id: Option<String>,
    #[serde(default)]
    pub related_type: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub action_required: bool,
    #[serde(default)]
    pub action_url: Option<String>,
}

impl NotificationDraft {
    /// Materialize the draft into an unread inbox entry.
    pub fn into_notification(self) -> ContactNotification {
        ContactNotification {
            id: String::new(),
            user_id: self.user_id,
            notification_type: self.notification_type,
            title: self.title,
            message: self.message,
            related_id: self.related_id,
            related_type: self.related_type,
            priority: self.priority,
            category: self.category,
            is_read: false,
            read_at: None,
            action_required: self.action_required,
            action_url: self.action_url,
            created_at: String::new(),
        }
    }
}
