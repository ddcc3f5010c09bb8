//! In-memory implementation of the `ContactStore` port.
//!
//! Used by tests and light embeddings. Holds plain vectors behind a
//! mutex; ordering contracts match the SQLite store (stable sorts over
//! the fixed-width RFC 3339 timestamps, insertion order as tiebreak).

use std::sync::Mutex;

use mh_core::error::{MhError, MhResult};

use crate::models::settings::ContactSettings;
use crate::models::request::{ContactRequest, RequestStatus};
use crate::models::conversation::{ContactConversation, ConversationStatus};
use crate::models::message::ContactMessage;
use crate::models::notification::ContactNotification;
use crate::store::{fresh_id, now_rfc3339, ContactStore};

#[derive(Default)]
struct Tables {
    settings: Vec<ContactSettings>,
    requests: Vec<ContactRequest>,
    conversations: Vec<ContactConversation>,
    messages: Vec<ContactMessage>,
    notifications: Vec<ContactNotification>,
}

/// Process-local store with no persistence.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MhResult<std::sync::MutexGuard<'_, Tables>> {
        self.inner
            .lock()
            .map_err(|_| MhError::Internal("memory store poisoned".into()))
    }
}

fn stamp_new(id: &mut String, created_at: &mut String) {
    if id.is_empty() {
        *id = fresh_id();
    }
    if created_at.is_empty() {
        *created_at = now_rfc3339();
    }
}

impl ContactStore for MemoryStore {
    // ─── Contact settings ───────────────────────────────────────────────

    fn find_settings(&self, user_id: &str) -> MhResult<Option<ContactSettings>> {
        let tables = self.lock()?;
        Ok(tables
            .settings
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    fn insert_settings(&self, mut settings: ContactSettings) -> MhResult<ContactSettings> {
        let mut tables = self.lock()?;
        if tables.settings.iter().any(|s| s.user_id == settings.user_id) {
            return Err(MhError::Database(format!(
                "settings already exist for user {}",
                settings.user_id
            )));
        }
        stamp_new(&mut settings.id, &mut settings.created_at);
        settings.updated_at = settings.created_at.clone();
        tables.settings.push(settings.clone());
        Ok(settings)
    }

    fn update_settings(&self, settings: &mut ContactSettings) -> MhResult<()> {
        settings.updated_at = now_rfc3339();
        let mut tables = self.lock()?;
        match tables.settings.iter_mut().find(|s| s.id == settings.id) {
            Some(slot) => {
                *slot = settings.clone();
                Ok(())
            }
            None => Err(MhError::SettingsNotFound(settings.user_id.clone())),
        }
    }

    // ─── Contact requests ───────────────────────────────────────────────

    fn insert_request(&self, mut request: ContactRequest) -> MhResult<ContactRequest> {
        stamp_new(&mut request.id, &mut request.created_at);
        request.updated_at = request.created_at.clone();
        let mut tables = self.lock()?;
        tables.requests.push(request.clone());
        Ok(request)
    }

    fn find_request(&self, id: &str) -> MhResult<Option<ContactRequest>> {
        let tables = self.lock()?;
        Ok(tables.requests.iter().find(|r| r.id == id).cloned())
    }

    fn update_request(&self, request: &mut ContactRequest) -> MhResult<()> {
        request.updated_at = now_rfc3339();
        let mut tables = self.lock()?;
        match tables.requests.iter_mut().find(|r| r.id == request.id) {
            Some(slot) => {
                *slot = request.clone();
                Ok(())
            }
            None => Err(MhError::RequestNotFound(request.id.clone())),
        }
    }

    fn list_requests_for_target(&self, user_id: &str) -> MhResult<Vec<ContactRequest>> {
        let tables = self.lock()?;
        // Newest first; insertion order breaks same-millisecond ties the
        // way rowid does in the SQLite store.
        let mut requests: Vec<ContactRequest> = tables
            .requests
            .iter()
            .filter(|r| r.target.id == user_id)
            .cloned()
            .collect();
        requests.reverse();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    fn list_requests_with_status(&self, status: RequestStatus) -> MhResult<Vec<ContactRequest>> {
        let tables = self.lock()?;
        let mut requests: Vec<ContactRequest> = tables
            .requests
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(requests)
    }

    // ─── Conversations ──────────────────────────────────────────────────

    fn insert_conversation(
        &self,
        mut conversation: ContactConversation,
    ) -> MhResult<ContactConversation> {
        stamp_new(&mut conversation.id, &mut conversation.created_at);
        conversation.updated_at = conversation.created_at.clone();
        let mut tables = self.lock()?;
        tables.conversations.push(conversation.clone());
        Ok(conversation)
    }

    fn find_conversation(&self, id: &str) -> MhResult<Option<ContactConversation>> {
        let tables = self.lock()?;
        Ok(tables.conversations.iter().find(|c| c.id == id).cloned())
    }

    fn find_conversation_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> MhResult<Option<ContactConversation>> {
        let tables = self.lock()?;
        Ok(tables
            .conversations
            .iter()
            .find(|c| {
                c.status != ConversationStatus::Deleted
                    && ((c.participant1.id == user_a && c.participant2.id == user_b)
                        || (c.participant1.id == user_b && c.participant2.id == user_a))
            })
            .cloned())
    }

    fn update_conversation(&self, conversation: &mut ContactConversation) -> MhResult<()> {
        conversation.updated_at = now_rfc3339();
        let mut tables = self.lock()?;
        match tables
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation.id)
        {
            Some(slot) => {
                *slot = conversation.clone();
                Ok(())
            }
            None => Err(MhError::ConversationNotFound(conversation.id.clone())),
        }
    }

    fn list_conversations_for(&self, user_id: &str) -> MhResult<Vec<ContactConversation>> {
        let tables = self.lock()?;
        let mut conversations: Vec<ContactConversation> = tables
            .conversations
            .iter()
            .filter(|c| {
                c.status != ConversationStatus::Deleted
                    && (c.participant1.id == user_id || c.participant2.id == user_id)
            })
            .cloned()
            .collect();
        conversations.reverse();
        conversations.sort_by(|a, b| {
            let a_key = a.last_message_at.as_deref().unwrap_or(&a.created_at);
            let b_key = b.last_message_at.as_deref().unwrap_or(&b.created_at);
            b_key.cmp(a_key)
        });
        Ok(conversations)
    }

    // ─── Messages ───────────────────────────────────────────────────────

    fn insert_message(&self, mut message: ContactMessage) -> MhResult<ContactMessage> {
        stamp_new(&mut message.id, &mut message.created_at);
        let mut tables = self.lock()?;
        tables.messages.push(message.clone());
        Ok(message)
    }

    fn find_message(&self, id: &str) -> MhResult<Option<ContactMessage>> {
        let tables = self.lock()?;
        Ok(tables.messages.iter().find(|m| m.id == id).cloned())
    }

    fn update_message(&self, message: &ContactMessage) -> MhResult<()> {
        let mut tables = self.lock()?;
        match tables.messages.iter_mut().find(|m| m.id == message.id) {
            Some(slot) => {
                slot.is_read = message.is_read;
                slot.read_at = message.read_at.clone();
                Ok(())
            }
            None => Err(MhError::MessageNotFound(message.id.clone())),
        }
    }

    fn list_messages(&self, conversation_id: &str) -> MhResult<Vec<ContactMessage>> {
        let tables = self.lock()?;
        let mut messages: Vec<ContactMessage> = tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        // Stable sort: same-millisecond messages keep insertion order.
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    // ─── Notifications ──────────────────────────────────────────────────

    fn insert_notification(
        &self,
        mut notification: ContactNotification,
    ) -> MhResult<ContactNotification> {
        stamp_new(&mut notification.id, &mut notification.created_at);
        let mut tables = self.lock()?;
        tables.notifications.push(notification.clone());
        Ok(notification)
    }

    fn find_notification(&self, id: &str) -> MhResult<Option<ContactNotification>> {
        let tables = self.lock()?;
        Ok(tables.notifications.iter().find(|n| n.id == id).cloned())
    }

    fn update_notification(&self, notification: &ContactNotification) -> MhResult<()> {
        let mut tables = self.lock()?;
        match tables
            .notifications
            .iter_mut()
            .find(|n| n.id == notification.id)
        {
            Some(slot) => {
                slot.is_read = notification.is_read;
                slot.read_at = notification.read_at.clone();
                Ok(())
            }
            None => Err(MhError::NotificationNotFound(notification.id.clone())),
        }
    }

    fn list_notifications_for(&self, user_id: &str) -> MhResult<Vec<ContactNotification>> {
        let tables = self.lock()?;
        let mut notifications: Vec<ContactNotification> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.reverse();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::{ContactRole, UserRef};

    fn user(id: &str) -> UserRef {
        UserRef::new(id, format!("User {id}"), format!("{id}@example.com"), ContactRole::Mentor)
    }

    #[test]
    fn test_settings_unique_per_user() {
        let store = MemoryStore::new();
        store
            .insert_settings(ContactSettings::defaults_for("u-1", "UTC"))
            .unwrap();
        let dup = store.insert_settings(ContactSettings::defaults_for("u-1", "UTC"));
        assert!(dup.is_err());
    }

    #[test]
    fn test_pair_lookup_both_orderings() {
        let store = MemoryStore::new();
        let conv = store
            .insert_conversation(ContactConversation::direct(user("a"), user("b"), None))
            .unwrap();

        assert_eq!(
            store.find_conversation_between("b", "a").unwrap().unwrap().id,
            conv.id
        );
        assert_eq!(
            store.find_conversation_between("a", "b").unwrap().unwrap().id,
            conv.id
        );
    }

    #[test]
    fn test_update_missing_request_errors() {
        let store = MemoryStore::new();
        let mut request = crate::models::request::ContactRequestDraft {
            requester: user("a"),
            target: user("b"),
            request_type: crate::models::request::RequestType::GeneralInquiry,
            subject: "hi".into(),
            message: "hello".into(),
            priority: Default::default(),
            category: String::new(),
            scheduled_meeting: None,
        }
        .into_request();
        request.id = "missing".into();

        let err = store.update_request(&mut request).unwrap_err();
        assert!(matches!(err, MhError::RequestNotFound(_)));
    }

    #[test]
    fn test_conversation_list_ordering() {
        let store = MemoryStore::new();
        let mut old = ContactConversation::direct(user("a"), user("b"), None);
        old.last_message_at = Some("2024-01-01T00:00:00.000Z".into());
        let mut new = ContactConversation::direct(user("a"), user("c"), None);
        new.last_message_at = Some("2024-02-01T00:00:00.000Z".into());
        store.insert_conversation(old).unwrap();
        store.insert_conversation(new).unwrap();

        let listed = store.list_conversations_for("a").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].participant2.id, "c");
        assert_eq!(listed[1].participant2.id, "b");
    }
}
