//! Conversation entity model.
//!
//! A conversation joins exactly two participants. Unread counters,
//! archive flags, and block flags all exist once per side; "side" is
//! resolved through `ParticipantSlot`.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use mh_core::error::{MhError, MhResult};

use super::common::{ContactRole, UserRef};

/// Kind of conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    DirectMessage,
    GroupMessage,
    SupportConversation,
    MeetingDiscussion,
    ProjectDiscussion,
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::DirectMessage => "direct_message",
            ConversationType::GroupMessage => "group_message",
            ConversationType::SupportConversation => "support_conversation",
            ConversationType::MeetingDiscussion => "meeting_discussion",
            ConversationType::ProjectDiscussion => "project_discussion",
        }
    }

    /// Parse a stored string; unrecognized values map to DirectMessage.
    pub fn parse(s: &str) -> Self {
        match s {
            "group_message" => ConversationType::GroupMessage,
            "support_conversation" => ConversationType::SupportConversation,
            "meeting_discussion" => ConversationType::MeetingDiscussion,
            "project_discussion" => ConversationType::ProjectDiscussion,
            _ => ConversationType::DirectMessage,
        }
    }
}

/// Overall conversation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Archived,
    Blocked,
    Deleted,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Active => "active",
            ConversationStatus::Archived => "archived",
            ConversationStatus::Blocked => "blocked",
            ConversationStatus::Deleted => "deleted",
        }
    }

    /// Parse a stored string; unrecognized values map to Active.
    pub fn parse(s: &str) -> Self {
        match s {
            "archived" => ConversationStatus::Archived,
            "blocked" => ConversationStatus::Blocked,
            "deleted" => ConversationStatus::Deleted,
            _ => ConversationStatus::Active,
        }
    }
}

/// Which of the two participant positions a user occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantSlot {
    First,
    Second,
}

impl ParticipantSlot {
    /// The opposite slot.
    pub fn other(&self) -> Self {
        match self {
            ParticipantSlot::First => ParticipantSlot::Second,
            ParticipantSlot::Second => ParticipantSlot::First,
        }
    }
}

/// A 1:1 conversation between two users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConversation {
    pub id: String,
    pub participant1: UserRef,
    pub participant2: UserRef,
    pub conversation_type: ConversationType,
    pub status: ConversationStatus,
    pub subject: Option<String>,
    pub last_message_at: Option<String>,
    pub last_message_id: Option<String>,
    pub last_message_content: Option<String>,
    pub last_message_sender: Option<String>,
    pub unread_count1: i64,
    pub unread_count2: i64,
    pub is_archived1: bool,
    pub is_archived2: bool,
    pub is_blocked1: bool,
    pub is_blocked2: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl ContactConversation {
    /// A fresh direct-message conversation between the two users.
    /// The id and timestamps are assigned by the store.
    pub fn direct(participant1: UserRef, participant2: UserRef, subject: Option<String>) -> Self {
        Self {
            id: String::new(),
            participant1,
            participant2,
            conversation_type: ConversationType::DirectMessage,
            status: ConversationStatus::Active,
            subject,
            last_message_at: None,
            last_message_id: None,
            last_message_content: None,
            last_message_sender: None,
            unread_count1: 0,
            unread_count2: 0,
            is_archived1: false,
            is_archived2: false,
            is_blocked1: false,
            is_blocked2: false,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    /// Which slot the user occupies, if they participate at all.
    pub fn slot_of(&self, user_id: &str) -> Option<ParticipantSlot> {
        if self.participant1.id == user_id {
            Some(ParticipantSlot::First)
        } else if self.participant2.id == user_id {
            Some(ParticipantSlot::Second)
        } else {
            None
        }
    }

    /// The participant in the given slot.
    pub fn participant(&self, slot: ParticipantSlot) -> &UserRef {
        match slot {
            ParticipantSlot::First => &self.participant1,
            ParticipantSlot::Second => &self.participant2,
        }
    }

    /// The other participant from the given user's perspective.
    pub fn counterpart(&self, user_id: &str) -> Option<&UserRef> {
        self.slot_of(user_id)
            .map(|slot| self.participant(slot.other()))
    }

    /// Unread count as seen by the participant in the given slot.
    pub fn unread_count(&self, slot: ParticipantSlot) -> i64 {
        match slot {
            ParticipantSlot::First => self.unread_count1,
            ParticipantSlot::Second => self.unread_count2,
        }
    }

    /// Increment the unread counter for the given slot.
    pub fn increment_unread(&mut self, slot: ParticipantSlot) {
        match slot {
            ParticipantSlot::First => self.unread_count1 += 1,
            ParticipantSlot::Second => self.unread_count2 += 1,
        }
    }

    /// Reset the unread counter for the given slot to zero.
    pub fn reset_unread(&mut self, slot: ParticipantSlot) {
        match slot {
            ParticipantSlot::First => self.unread_count1 = 0,
            ParticipantSlot::Second => self.unread_count2 = 0,
        }
    }

    /// Archive flag for the given slot.
    pub fn is_archived(&self, slot: ParticipantSlot) -> bool {
        match slot {
            ParticipantSlot::First => self.is_archived1,
            ParticipantSlot::Second => self.is_archived2,
        }
    }

    /// Set the archive flag for the given slot.
    pub fn set_archived(&mut self, slot: ParticipantSlot, archived: bool) {
        match slot {
            ParticipantSlot::First => self.is_archived1 = archived,
            ParticipantSlot::Second => self.is_archived2 = archived,
        }
    }

    /// Block flag for the given slot.
    pub fn is_blocked(&self, slot: ParticipantSlot) -> bool {
        match slot {
            ParticipantSlot::First => self.is_blocked1,
            ParticipantSlot::Second => self.is_blocked2,
        }
    }

    /// Set the block flag for the given slot. The conversation status
    /// follows the flags: blocked while either side blocks, active when
    /// neither does.
    pub fn set_blocked(&mut self, slot: ParticipantSlot, blocked: bool) {
        match slot {
            ParticipantSlot::First => self.is_blocked1 = blocked,
            ParticipantSlot::Second => self.is_blocked2 = blocked,
        }
        if self.status != ConversationStatus::Deleted {
            self.status = if self.is_blocked1 || self.is_blocked2 {
                ConversationStatus::Blocked
            } else {
                ConversationStatus::Active
            };
        }
    }

    /// Whether either side has blocked the conversation.
    pub fn either_blocked(&self) -> bool {
        self.is_blocked1 || self.is_blocked2
    }

    /// Construct from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            participant1: UserRef {
                id: row.get("participant1_id")?,
                name: row.get("participant1_name")?,
                email: row.get("participant1_email")?,
                role: ContactRole::parse(&row.get::<_, String>("participant1_role")?),
            },
            participant2: UserRef {
                id: row.get("participant2_id")?,
                name: row.get("participant2_name")?,
                email: row.get("participant2_email")?,
                role: ContactRole::parse(&row.get::<_, String>("participant2_role")?),
            },
            conversation_type: ConversationType::parse(
                &row.get::<_, String>("conversation_type")?,
            ),
            status: ConversationStatus::parse(&row.get::<_, String>("status")?),
            subject: row.get("subject")?,
            last_message_at: row.get("last_message_at")?,
            last_message_id: row.get("last_message_id")?,
            last_message_content: row.get("last_message_content")?,
            last_message_sender: row.get("last_message_sender")?,
            unread_count1: row.get("unread_count1")?,
            unread_count2: row.get("unread_count2")?,
            is_archived1: row.get::<_, i32>("is_archived1")? != 0,
            is_archived2: row.get::<_, i32>("is_archived2")? != 0,
            is_blocked1: row.get::<_, i32>("is_blocked1")? != 0,
            is_blocked2: row.get::<_, i32>("is_blocked2")? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert this conversation.
    pub fn insert(&self, conn: &Connection) -> MhResult<()> {
        conn.execute(
            "INSERT INTO conversations (
                id, participant1_id, participant1_name, participant1_email, participant1_role,
                participant2_id, participant2_name, participant2_email, participant2_role,
                conversation_type, status, subject,
                last_message_at, last_message_id, last_message_content, last_message_sender,
                unread_count1, unread_count2, is_archived1, is_archived2,
                is_blocked1, is_blocked2, created_at, updated_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23,?24)",
            params![
                self.id,
                self.participant1.id,
                self.participant1.name,
                self.participant1.email,
                self.participant1.role.as_str(),
                self.participant2.id,
                self.participant2.name,
                self.participant2.email,
                self.participant2.role.as_str(),
                self.conversation_type.as_str(),
                self.status.as_str(),
                self.subject,
                self.last_message_at,
                self.last_message_id,
                self.last_message_content,
                self.last_message_sender,
                self.unread_count1,
                self.unread_count2,
                self.is_archived1 as i32,
                self.is_archived2 as i32,
                self.is_blocked1 as i32,
                self.is_blocked2 as i32,
                self.created_at,
                self.updated_at,
            ],
        )
        .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(())
    }

    /// Write back all mutable fields of this conversation.
    pub fn update(&self, conn: &Connection) -> MhResult<()> {
        conn.execute(
            "UPDATE conversations SET
                status = ?1, subject = ?2, last_message_at = ?3, last_message_id = ?4,
                last_message_content = ?5, last_message_sender = ?6,
                unread_count1 = ?7, unread_count2 = ?8,
                is_archived1 = ?9, is_archived2 = ?10,
                is_blocked1 = ?11, is_blocked2 = ?12, updated_at = ?13
            WHERE id = ?14",
            params![
                self.status.as_str(),
                self.subject,
                self.last_message_at,
                self.last_message_id,
                self.last_message_content,
                self.last_message_sender,
                self.unread_count1,
                self.unread_count2,
                self.is_archived1 as i32,
                self.is_archived2 as i32,
                self.is_blocked1 as i32,
                self.is_blocked2 as i32,
                self.updated_at,
                self.id,
            ],
        )
        .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> (UserRef, UserRef) {
        (
            UserRef::new("u-1", "Ravi", "ravi@example.com", ContactRole::Student),
            UserRef::new("u-2", "Asha", "asha@example.com", ContactRole::Mentor),
        )
    }

    #[test]
    fn test_slot_resolution() {
        let (a, b) = users();
        let conv = ContactConversation::direct(a, b, None);
        assert_eq!(conv.slot_of("u-1"), Some(ParticipantSlot::First));
        assert_eq!(conv.slot_of("u-2"), Some(ParticipantSlot::Second));
        assert_eq!(conv.slot_of("u-3"), None);
        assert_eq!(conv.counterpart("u-1").unwrap().id, "u-2");
    }

    #[test]
    fn test_unread_counters_independent() {
        let (a, b) = users();
        let mut conv = ContactConversation::direct(a, b, None);
        conv.increment_unread(ParticipantSlot::Second);
        conv.increment_unread(ParticipantSlot::Second);
        assert_eq!(conv.unread_count1, 0);
        assert_eq!(conv.unread_count2, 2);

        conv.reset_unread(ParticipantSlot::Second);
        assert_eq!(conv.unread_count2, 0);
        assert_eq!(conv.unread_count1, 0);
    }

    #[test]
    fn test_block_flags_drive_status() {
        let (a, b) = users();
        let mut conv = ContactConversation::direct(a, b, None);
        assert_eq!(conv.status, ConversationStatus::Active);

        conv.set_blocked(ParticipantSlot::First, true);
        assert_eq!(conv.status, ConversationStatus::Blocked);
        assert!(conv.either_blocked());

        conv.set_blocked(ParticipantSlot::First, false);
        assert_eq!(conv.status, ConversationStatus::Active);
        assert!(!conv.either_blocked());
    }

    #[test]
    fn test_archive_is_per_slot() {
        let (a, b) = users();
        let mut conv = ContactConversation::direct(a, b, None);
        conv.set_archived(ParticipantSlot::First, true);
        assert!(conv.is_archived(ParticipantSlot::First));
        assert!(!conv.is_archived(ParticipantSlot::Second));
    }
}
