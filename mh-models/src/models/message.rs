//! Message entity model.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use mh_core::error::{MhError, MhResult};

use super::common::{ContactRole, Priority, UserRef};

/// Content kind of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    File,
    MeetingInvite,
    SystemMessage,
    Notification,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
            MessageType::MeetingInvite => "meeting_invite",
            MessageType::SystemMessage => "system_message",
            MessageType::Notification => "notification",
        }
    }

    /// Parse a stored string; unrecognized values map to Text.
    pub fn parse(s: &str) -> Self {
        match s {
            "image" => MessageType::Image,
            "file" => MessageType::File,
            "meeting_invite" => MessageType::MeetingInvite,
            "system_message" => MessageType::SystemMessage,
            "notification" => MessageType::Notification,
            _ => MessageType::Text,
        }
    }
}

/// An attachment reference carried on a message. The binary itself lives
/// with the upload collaborator; only the descriptor is stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachment {
    pub name: String,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

/// A single message inside a conversation. Immutable after insert except
/// for the read-state fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender: UserRef,
    pub recipient: UserRef,
    pub message_type: MessageType,
    pub content: String,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub priority: Priority,
    pub category: String,
    pub attachments: Vec<MessageAttachment>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

impl ContactMessage {
    /// Construct from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            conversation_id: row.get("conversation_id")?,
            sender: UserRef {
                id: row.get("sender_id")?,
                name: row.get("sender_name")?,
                email: row.get("sender_email")?,
                role: ContactRole::parse(&row.get::<_, String>("sender_role")?),
            },
            recipient: UserRef {
                id: row.get("recipient_id")?,
                name: row.get("recipient_name")?,
                email: row.get("recipient_email")?,
                role: ContactRole::parse(&row.get::<_, String>("recipient_role")?),
            },
            message_type: MessageType::parse(&row.get::<_, String>("message_type")?),
            content: row.get("content")?,
            is_read: row.get::<_, i32>("is_read")? != 0,
            read_at: row.get("read_at")?,
            priority: Priority::parse(&row.get::<_, String>("priority")?),
            category: row.get("category")?,
            attachments: serde_json::from_str(&row.get::<_, String>("attachments")?)
                .unwrap_or_default(),
            metadata: row
                .get::<_, Option<String>>("metadata")?
                .and_then(|s| serde_json::from_str(&s).ok()),
            created_at: row.get("created_at")?,
        })
    }

    /// Insert this message.
    pub fn insert(&self, conn: &Connection) -> MhResult<()> {
        conn.execute(
            "INSERT INTO messages (
                id, conversation_id, sender_id, sender_name, sender_email, sender_role,
                recipient_id, recipient_name, recipient_email, recipient_role,
                message_type, content, is_read, read_at, priority, category,
                attachments, metadata, created_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)",
            params![
                self.id,
                self.conversation_id,
                self.sender.id,
                self.sender.name,
                self.sender.email,
                self.sender.role.as_str(),
                self.recipient.id,
                self.recipient.name,
                self.recipient.email,
                self.recipient.role.as_str(),
                self.message_type.as_str(),
                self.content,
                self.is_read as i32,
                self.read_at,
                self.priority.as_str(),
                self.category,
                serde_json::to_string(&self.attachments)?,
                self.metadata.as_ref().map(|v| v.to_string()),
                self.created_at,
            ],
        )
        .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(())
    }

    /// Write back the read-state, the only mutable part of a message.
    pub fn update_read_state(&self, conn: &Connection) -> MhResult<()> {
        conn.execute(
            "UPDATE messages SET is_read = ?1, read_at = ?2 WHERE id = ?3",
            params![self.is_read as i32, self.read_at, self.id],
        )
        .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Input for sending a message. The conversation is resolved (or created)
/// by the message service; id, read-state, and timestamp are assigned on
/// insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessageDraft {
    pub sender: UserRef,
    pub recipient: UserRef,
    #[serde(default = "default_message_type")]
    pub message_type: MessageType,
    pub content: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub attachments: Vec<MessageAttachment>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Subject used only when this send creates a fresh conversation.
    #[serde(default)]
    pub subject: Option<String>,
}

fn default_message_type() -> MessageType {
    MessageType::Text
}

impl ContactMessageDraft {
    /// Materialize the draft into an unread message in the conversation.
    pub fn into_message(self, conversation_id: &str) -> ContactMessage {
        ContactMessage {
            id: String::new(),
            conversation_id: conversation_id.to_string(),
            sender: self.sender,
            recipient: self.recipient,
            message_type: self.message_type,
            content: self.content,
            is_read: false,
            read_at: None,
            priority: self.priority,
            category: self.category,
            attachments: self.attachments,
            metadata: self.metadata,
            created_at: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_roundtrip() {
        for mt in [
            MessageType::Text,
            MessageType::Image,
            MessageType::File,
            MessageType::MeetingInvite,
            MessageType::SystemMessage,
            MessageType::Notification,
        ] {
            assert_eq!(MessageType::parse(mt.as_str()), mt);
        }
        assert_eq!(MessageType::parse("unknown"), MessageType::Text);
    }

    #[test]
    fn test_draft_materializes_unread() {
        let draft = ContactMessageDraft {
            sender: UserRef::new("u-1", "Ravi", "ravi@example.com", ContactRole::Student),
            recipient: UserRef::new("u-2", "Asha", "asha@example.com", ContactRole::Mentor),
            message_type: MessageType::Text,
            content: "Hello!".into(),
            priority: Priority::Medium,
            category: String::new(),
            attachments: vec![],
            metadata: None,
            subject: None,
        };
        let message = draft.into_message("conv-1");
        assert_eq!(message.conversation_id, "conv-1");
        assert!(!message.is_read);
        assert!(message.read_at.is_none());
    }

    #[test]
    fn test_attachment_serde() {
        let att = MessageAttachment {
            name: "deck.pdf".into(),
            url: "https://files.example.com/deck.pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: 52_000,
        };
        let json = serde_json::to_string(&vec![att.clone()]).unwrap();
        let back: Vec<MessageAttachment> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![att]);
    }
}
