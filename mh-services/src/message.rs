//! Message service.
//!
//! Owns message records: gated sending into a (possibly fresh)
//! conversation, transcript listing, and per-message read-state.
//!
//! The send sequence (resolve conversation, persist message, fold
//! effects into the conversation, notify) is not atomic; a crash
//! between steps can leave a message without its conversation summary
//! update. `ConversationService::refresh_summary` repairs that from
//! the message log.

use std::sync::Arc;
use tracing::{info, debug, warn};

use mh_core::constants::{categories, related};
use mh_core::error::{MhError, MhResult};
use mh_models::store::now_rfc3339;
use mh_models::{
    ContactMessage, ContactMessageDraft, ContactStore, NotificationDraft, NotificationType,
};

use crate::conversation::ConversationService;
use crate::event_bus::{AppEvent, EventBus};
use crate::notification::NotificationService;
use crate::service::{Service, ServiceState};
use crate::settings::ContactSettingsService;

/// Service managing messages.
pub struct MessageService {
    state: ServiceState,
    store: Arc<dyn ContactStore>,
    event_bus: EventBus,
}

impl MessageService {
    /// Create a new MessageService.
    pub fn new(store: Arc<dyn ContactStore>, event_bus: EventBus) -> Self {
        Self {
            state: ServiceState::Created,
            store,
            event_bus,
        }
    }

    /// Send a direct message.
    ///
    /// Permission checks run before any write: the recipient's settings
    /// gate (`DirectMessagesDisabled`, `SenderBlocked`), then the
    /// conversation-level block flags once the conversation is resolved.
    /// On refusal no message is persisted, and a fresh conversation is
    /// only ever created after the settings gate has passed.
    ///
    /// The recipient is notified best-effort; a failed notification
    /// never fails the send.
    pub async fn send(
        &self,
        settings: &ContactSettingsService,
        conversations: &ConversationService,
        notifier: &NotificationService,
        draft: ContactMessageDraft,
    ) -> MhResult<ContactMessage> {
        settings.authorize_message(&draft.sender.id, &draft.recipient.id)?;

        let conversation =
            conversations.find_or_create(&draft.sender, &draft.recipient, draft.subject.as_deref())?;

        if conversation.either_blocked() {
            let recipient_slot = conversation.slot_of(&draft.recipient.id);
            let recipient_blocked = recipient_slot
                .map(|slot| conversation.is_blocked(slot))
                .unwrap_or(false);
            return Err(if recipient_blocked {
                MhError::SenderBlocked {
                    sender: draft.sender.id.clone(),
                    target: draft.recipient.id.clone(),
                }
            } else {
                MhError::Service(format!(
                    "cannot send into conversation {} while it is blocked by the sender",
                    conversation.id
                ))
            });
        }

        let sender_name = draft.sender.name.clone();
        let recipient_id = draft.recipient.id.clone();
        let priority = draft.priority;

        let message = self.store.insert_message(draft.into_message(&conversation.id))?;
        conversations.apply_message_effects(&message)?;

        info!(
            "message {} sent in conversation {} to {}",
            message.id, message.conversation_id, recipient_id
        );
        self.event_bus.emit(AppEvent::MessageSent {
            message_id: message.id.clone(),
            conversation_id: message.conversation_id.clone(),
            recipient_id: recipient_id.clone(),
        });

        let notification = NotificationDraft {
            user_id: recipient_id,
            notification_type: NotificationType::NewMessage,
            title: "New message".to_string(),
            message: format!("{sender_name} sent you a message"),
            related_id: Some(message.id.clone()),
            related_type: Some(related::MESSAGE.to_string()),
            priority,
            category: categories::MESSAGING.to_string(),
            action_required: false,
            action_url: None,
        };
        if let Err(e) = notifier.dispatch(notification).await {
            warn!("failed to notify recipient of message {}: {e}", message.id);
        }

        Ok(message)
    }

    /// Mark a message as read. Idempotent: `read_at` is stamped on the
    /// first call only; repeat calls are no-ops, not errors. Does not
    /// touch the conversation's unread counter; that resets when the
    /// participant opens the conversation.
    pub fn mark_read(&self, message_id: &str) -> MhResult<ContactMessage> {
        let mut message = self
            .store
            .find_message(message_id)?
            .ok_or_else(|| MhError::MessageNotFound(message_id.to_string()))?;

        if !message.is_read {
            message.is_read = true;
            message.read_at = Some(now_rfc3339());
            self.store.update_message(&message)?;

            debug!("message {message_id} marked read");
            self.event_bus.emit(AppEvent::MessageRead {
                message_id: message_id.to_string(),
            });
        }
        Ok(message)
    }

    /// Fetch a message by id.
    pub fn get(&self, message_id: &str) -> MhResult<ContactMessage> {
        self.store
            .find_message(message_id)?
            .ok_or_else(|| MhError::MessageNotFound(message_id.to_string()))
    }

    /// The conversation transcript, oldest first.
    pub fn list(&self, conversation_id: &str) -> MhResult<Vec<ContactMessage>> {
        self.store.list_messages(conversation_id)
    }
}

impl Service for MessageService {
    fn name(&self) -> &str { "message" }
    fn state(&self) -> ServiceState { self.state }
    fn init(&mut self) -> MhResult<()> {
        self.state = ServiceState::Running;
        info!("message service initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> MhResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mh_core::config::{AppConfig, ConfigHandle};
    use mh_models::{ContactRole, ContactSettingsPatch, MemoryStore, MessageType, Priority, UserRef};

    struct Fixture {
        settings: ContactSettingsService,
        conversations: ConversationService,
        notifier: NotificationService,
        messages: MessageService,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn ContactStore> = Arc::new(MemoryStore::new());
        let config = ConfigHandle::new(AppConfig::default());
        let bus = EventBus::new(64);
        Fixture {
            settings: ContactSettingsService::new(store.clone(), config.clone(), bus.clone()),
            conversations: ConversationService::new(store.clone(), bus.clone()),
            notifier: NotificationService::new(store.clone(), config, bus.clone()),
            messages: MessageService::new(store, bus),
        }
    }

    fn user(id: &str, role: ContactRole) -> UserRef {
        UserRef::new(id, format!("User {id}"), format!("{id}@example.com"), role)
    }

    fn draft(sender: &UserRef, recipient: &UserRef, content: &str) -> ContactMessageDraft {
        ContactMessageDraft {
            sender: sender.clone(),
            recipient: recipient.clone(),
            message_type: MessageType::Text,
            content: content.into(),
            priority: Priority::Medium,
            category: String::new(),
            attachments: vec![],
            metadata: None,
            subject: None,
        }
    }

    #[tokio::test]
    async fn test_send_creates_conversation_and_counts() {
        let f = fixture();
        let a = user("a", ContactRole::Student);
        let b = user("b", ContactRole::Mentor);

        let msg = f
            .messages
            .send(&f.settings, &f.conversations, &f.notifier, draft(&a, &b, "hello"))
            .await
            .unwrap();
        assert!(!msg.is_read);

        let conv = f.conversations.get(&msg.conversation_id).unwrap();
        assert_eq!(conv.unread_count(conv.slot_of("b").unwrap()), 1);
        assert_eq!(conv.unread_count(conv.slot_of("a").unwrap()), 0);
        assert_eq!(conv.last_message_content.as_deref(), Some("hello"));
        assert_eq!(conv.last_message_sender.as_deref(), Some("a"));

        // Recipient got an inbox notification
        let inbox = f.notifier.list("b").unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].notification_type, NotificationType::NewMessage);
    }

    #[tokio::test]
    async fn test_reply_reuses_conversation() {
        let f = fixture();
        let a = user("a", ContactRole::Student);
        let b = user("b", ContactRole::Mentor);

        let first = f
            .messages
            .send(&f.settings, &f.conversations, &f.notifier, draft(&a, &b, "hi"))
            .await
            .unwrap();
        let reply = f
            .messages
            .send(&f.settings, &f.conversations, &f.notifier, draft(&b, &a, "hi back"))
            .await
            .unwrap();

        assert_eq!(first.conversation_id, reply.conversation_id);
        let conv = f.conversations.get(&first.conversation_id).unwrap();
        // Each side has exactly the counterpart's message unread
        assert_eq!(conv.unread_count(conv.slot_of("a").unwrap()), 1);
        assert_eq!(conv.unread_count(conv.slot_of("b").unwrap()), 1);
    }

    #[tokio::test]
    async fn test_send_refused_when_messages_disabled() {
        let f = fixture();
        let a = user("a", ContactRole::Student);
        let b = user("b", ContactRole::Mentor);

        f.settings
            .upsert(
                "b",
                &ContactSettingsPatch {
                    allow_direct_messages: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = f
            .messages
            .send(&f.settings, &f.conversations, &f.notifier, draft(&a, &b, "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, MhError::DirectMessagesDisabled(_)));

        // No message, no conversation, no notification was created
        assert!(f.conversations.list("a").unwrap().is_empty());
        assert!(f.conversations.list("b").unwrap().is_empty());
        assert!(f.notifier.list("b").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_refused_into_blocked_conversation() {
        let f = fixture();
        let a = user("a", ContactRole::Student);
        let b = user("b", ContactRole::Mentor);

        let msg = f
            .messages
            .send(&f.settings, &f.conversations, &f.notifier, draft(&a, &b, "hello"))
            .await
            .unwrap();
        f.conversations.set_blocked("b", &msg.conversation_id, true).unwrap();

        let err = f
            .messages
            .send(&f.settings, &f.conversations, &f.notifier, draft(&a, &b, "again"))
            .await
            .unwrap_err();
        assert!(matches!(err, MhError::SenderBlocked { .. }));
        assert_eq!(f.messages.list(&msg.conversation_id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_idempotent_and_counter_untouched() {
        let f = fixture();
        let a = user("a", ContactRole::Student);
        let b = user("b", ContactRole::Mentor);

        let msg = f
            .messages
            .send(&f.settings, &f.conversations, &f.notifier, draft(&a, &b, "hello"))
            .await
            .unwrap();

        let first = f.messages.mark_read(&msg.id).unwrap();
        assert!(first.is_read);
        let stamped = first.read_at.clone().unwrap();

        let second = f.messages.mark_read(&msg.id).unwrap();
        assert_eq!(second.read_at.unwrap(), stamped);

        // Per-message read does not reset the conversation counter
        assert_eq!(f.conversations.unread_count("b", &msg.conversation_id).unwrap(), 1);
        // Opening the conversation does
        f.conversations.mark_read("b", &msg.conversation_id).unwrap();
        assert_eq!(f.conversations.unread_count("b", &msg.conversation_id).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transcript_is_chronological() {
        let f = fixture();
        let a = user("a", ContactRole::Student);
        let b = user("b", ContactRole::Mentor);

        for text in ["one", "two", "three"] {
            f.messages
                .send(&f.settings, &f.conversations, &f.notifier, draft(&a, &b, text))
                .await
                .unwrap();
        }

        let conv = f.conversations.list("a").unwrap().remove(0);
        let transcript = f.messages.list(&conv.id).unwrap();
        let contents: Vec<&str> = transcript.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_mark_read_unknown_id() {
        let f = fixture();
        let err = f.messages.mark_read("missing").unwrap_err();
        assert!(matches!(err, MhError::MessageNotFound(_)));
    }
}
