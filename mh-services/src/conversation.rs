//! Conversation service.
//!
//! Owns conversation identity (one live conversation per unordered pair
//! of participants), the per-side unread counters and archive/block
//! flags, and the denormalized last-message summary.

use std::sync::Arc;
use tracing::{info, debug, warn};

use mh_core::error::{MhError, MhResult};
use mh_models::store::now_rfc3339;
use mh_models::{
    ContactConversation, ContactMessage, ContactStore, ConversationStatus, ParticipantSlot,
    UserRef,
};

use crate::event_bus::{AppEvent, EventBus};
use crate::service::{Service, ServiceState};

/// Service managing 1:1 conversations.
pub struct ConversationService {
    state: ServiceState,
    store: Arc<dyn ContactStore>,
    event_bus: EventBus,
}

impl ConversationService {
    /// Create a new ConversationService.
    pub fn new(store: Arc<dyn ContactStore>, event_bus: EventBus) -> Self {
        Self {
            state: ServiceState::Created,
            store,
            event_bus,
        }
    }

    /// Fetch a conversation by id.
    pub fn get(&self, conversation_id: &str) -> MhResult<ContactConversation> {
        self.store
            .find_conversation(conversation_id)?
            .ok_or_else(|| MhError::ConversationNotFound(conversation_id.to_string()))
    }

    /// The live conversation between the unordered pair, created as a
    /// direct-message conversation if none exists. A conversation stored
    /// as (A, B) is found for (B, A) as well.
    pub fn find_or_create(
        &self,
        user_a: &UserRef,
        user_b: &UserRef,
        subject: Option<&str>,
    ) -> MhResult<ContactConversation> {
        if let Some(existing) = self.store.find_conversation_between(&user_a.id, &user_b.id)? {
            return Ok(existing);
        }

        let conversation = self.store.insert_conversation(ContactConversation::direct(
            user_a.clone(),
            user_b.clone(),
            subject.map(String::from),
        ))?;

        info!(
            "created conversation {} between {} and {}",
            conversation.id, user_a.id, user_b.id
        );
        self.event_bus.emit(AppEvent::ConversationCreated {
            conversation_id: conversation.id.clone(),
        });
        Ok(conversation)
    }

    /// Fold a freshly persisted message into the conversation: update the
    /// last-message summary and increment the recipient's unread counter.
    /// The sender's own counter is never touched.
    pub fn apply_message_effects(&self, message: &ContactMessage) -> MhResult<ContactConversation> {
        let mut conversation = self.get(&message.conversation_id)?;

        let recipient_slot = conversation
            .slot_of(&message.recipient.id)
            .ok_or_else(|| MhError::NotAParticipant {
                user_id: message.recipient.id.clone(),
                conversation_id: conversation.id.clone(),
            })?;

        conversation.last_message_at = Some(message.created_at.clone());
        conversation.last_message_id = Some(message.id.clone());
        conversation.last_message_content = Some(message.content.clone());
        conversation.last_message_sender = Some(message.sender.id.clone());
        conversation.increment_unread(recipient_slot);

        self.store.update_conversation(&mut conversation)?;
        self.event_bus.emit(AppEvent::ConversationUpdated {
            conversation_id: conversation.id.clone(),
        });
        Ok(conversation)
    }

    /// Conversations the user participates in and has not archived,
    /// newest activity first. The counterpart's archive flag has no
    /// effect on this user's view.
    pub fn list(&self, user_id: &str) -> MhResult<Vec<ContactConversation>> {
        let conversations = self.store.list_conversations_for(user_id)?;
        Ok(conversations
            .into_iter()
            .filter(|c| {
                c.slot_of(user_id)
                    .map(|slot| !c.is_archived(slot))
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Archive the conversation for this user only.
    pub fn archive(&self, user_id: &str, conversation_id: &str) -> MhResult<ContactConversation> {
        self.set_archived(user_id, conversation_id, true)
    }

    /// Unarchive the conversation for this user only.
    pub fn unarchive(&self, user_id: &str, conversation_id: &str) -> MhResult<ContactConversation> {
        self.set_archived(user_id, conversation_id, false)
    }

    fn set_archived(
        &self,
        user_id: &str,
        conversation_id: &str,
        archived: bool,
    ) -> MhResult<ContactConversation> {
        let mut conversation = self.get(conversation_id)?;
        let slot = self.slot_for(&conversation, user_id)?;

        conversation.set_archived(slot, archived);
        self.store.update_conversation(&mut conversation)?;

        debug!("conversation {conversation_id} archived={archived} for {user_id}");
        self.event_bus.emit(AppEvent::ConversationArchived {
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            archived,
        });
        Ok(conversation)
    }

    /// Raise or clear this user's block flag on the conversation. While
    /// either side blocks, the conversation status is blocked and sends
    /// into it are refused.
    pub fn set_blocked(
        &self,
        user_id: &str,
        conversation_id: &str,
        blocked: bool,
    ) -> MhResult<ContactConversation> {
        let mut conversation = self.get(conversation_id)?;
        let slot = self.slot_for(&conversation, user_id)?;

        conversation.set_blocked(slot, blocked);
        self.store.update_conversation(&mut conversation)?;

        debug!("conversation {conversation_id} blocked={blocked} by {user_id}");
        self.event_bus.emit(AppEvent::ConversationUpdated {
            conversation_id: conversation_id.to_string(),
        });
        Ok(conversation)
    }

    /// Opening a conversation: reset this user's unread counter to zero
    /// and mark their unread incoming messages as read. This is the
    /// reconciliation point between the cached counter and per-message
    /// read-state; `MessageService::mark_read` deliberately leaves the
    /// counter alone.
    pub fn mark_read(&self, user_id: &str, conversation_id: &str) -> MhResult<ContactConversation> {
        let mut conversation = self.get(conversation_id)?;
        let slot = self.slot_for(&conversation, user_id)?;

        let now = now_rfc3339();
        for mut message in self.store.list_messages(conversation_id)? {
            if message.recipient.id == user_id && !message.is_read {
                message.is_read = true;
                message.read_at = Some(now.clone());
                self.store.update_message(&message)?;
            }
        }

        conversation.reset_unread(slot);
        self.store.update_conversation(&mut conversation)?;

        debug!("conversation {conversation_id} marked read for {user_id}");
        self.event_bus.emit(AppEvent::ConversationUpdated {
            conversation_id: conversation_id.to_string(),
        });
        Ok(conversation)
    }

    /// Rebuild the last-message summary from the message log. Repairs the
    /// denormalized fields after a crash between persisting a message and
    /// updating its conversation.
    pub fn refresh_summary(&self, conversation_id: &str) -> MhResult<ContactConversation> {
        let mut conversation = self.get(conversation_id)?;
        let messages = self.store.list_messages(conversation_id)?;

        match messages.last() {
            Some(last) => {
                conversation.last_message_at = Some(last.created_at.clone());
                conversation.last_message_id = Some(last.id.clone());
                conversation.last_message_content = Some(last.content.clone());
                conversation.last_message_sender = Some(last.sender.id.clone());
            }
            None => {
                conversation.last_message_at = None;
                conversation.last_message_id = None;
                conversation.last_message_content = None;
                conversation.last_message_sender = None;
            }
        }

        self.store.update_conversation(&mut conversation)?;
        warn!("conversation {conversation_id} summary rebuilt from message log");
        Ok(conversation)
    }

    /// Soft-delete the conversation. Deleted conversations disappear from
    /// listings and pair lookup, so a fresh conversation between the same
    /// pair may be created later.
    pub fn delete(&self, conversation_id: &str) -> MhResult<()> {
        let mut conversation = self.get(conversation_id)?;
        conversation.status = ConversationStatus::Deleted;
        self.store.update_conversation(&mut conversation)?;

        info!("deleted conversation {conversation_id}");
        self.event_bus.emit(AppEvent::ConversationDeleted {
            conversation_id: conversation_id.to_string(),
        });
        Ok(())
    }

    /// This user's unread count for the conversation.
    pub fn unread_count(&self, user_id: &str, conversation_id: &str) -> MhResult<i64> {
        let conversation = self.get(conversation_id)?;
        let slot = self.slot_for(&conversation, user_id)?;
        Ok(conversation.unread_count(slot))
    }

    fn slot_for(
        &self,
        conversation: &ContactConversation,
        user_id: &str,
    ) -> MhResult<ParticipantSlot> {
        conversation
            .slot_of(user_id)
            .ok_or_else(|| MhError::NotAParticipant {
                user_id: user_id.to_string(),
                conversation_id: conversation.id.clone(),
            })
    }
}

impl Service for ConversationService {
    fn name(&self) -> &str { "conversation" }
    fn state(&self) -> ServiceState { self.state }
    fn init(&mut self) -> MhResult<()> {
        self.state = ServiceState::Running;
        info!("conversation service initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> MhResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}
