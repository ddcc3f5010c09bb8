//! The `ContactStore` persistence port.
//!
//! The coordination services are written against this trait rather than
//! a concrete backend, so the SQLite store can be swapped for the
//! in-memory store in tests or light embeddings.
//!
//! Contract notes shared by all implementations:
//! - `insert_*` assigns a fresh uuid id and RFC 3339 timestamps when the
//!   incoming record has them blank, and returns the stored record.
//! - `update_*` writes back a previously loaded record's mutable fields
//!   and stamps `updated_at` where the entity has one. Messages and
//!   notifications only ever update their read-state.
//! - Consistency is read-your-writes per record; there are no
//!   cross-record transactions. Multi-step flows (send message) are not
//!   atomic, and the conversation's denormalized summary fields are a
//!   cache that `ConversationService::refresh_summary` can rebuild from
//!   the message log. The unread counters are likewise caches of message
//!   read-state, reconciled when a participant opens the conversation
//!   (`ConversationService::mark_read`), never by per-message mark-read.

use chrono::{SecondsFormat, Utc};
use mh_core::error::MhResult;

use crate::models::settings::ContactSettings;
use crate::models::request::{ContactRequest, RequestStatus};
use crate::models::conversation::ContactConversation;
use crate::models::message::ContactMessage;
use crate::models::notification::ContactNotification;

/// Current time as a fixed-width RFC 3339 string (millisecond precision,
/// `Z` suffix). Fixed width keeps lexicographic and chronological order
/// identical, which both stores rely on for sorting.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A fresh uuid entity id.
pub fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Persistence port for the five contact entities.
pub trait ContactStore: Send + Sync {
    // ─── Contact settings ───────────────────────────────────────────────

    /// Fetch a user's settings record, if one exists.
    fn find_settings(&self, user_id: &str) -> MhResult<Option<ContactSettings>>;

    /// Insert a settings record (one per user; duplicate user_id is an error).
    fn insert_settings(&self, settings: ContactSettings) -> MhResult<ContactSettings>;

    /// Write back a previously loaded settings record.
    fn update_settings(&self, settings: &mut ContactSettings) -> MhResult<()>;

    // ─── Contact requests ───────────────────────────────────────────────

    /// Insert a contact request.
    fn insert_request(&self, request: ContactRequest) -> MhResult<ContactRequest>;

    /// Fetch a request by id.
    fn find_request(&self, id: &str) -> MhResult<Option<ContactRequest>>;

    /// Write back a previously loaded request.
    fn update_request(&self, request: &mut ContactRequest) -> MhResult<()>;

    /// All requests addressed to the user, unfiltered. The request
    /// service applies filters and priority ordering on top.
    fn list_requests_for_target(&self, user_id: &str) -> MhResult<Vec<ContactRequest>>;

    /// All requests currently in the given status, across all targets.
    /// Used by the expiry sweep.
    fn list_requests_with_status(&self, status: RequestStatus) -> MhResult<Vec<ContactRequest>>;

    // ─── Conversations ──────────────────────────────────────────────────

    /// Insert a conversation.
    fn insert_conversation(
        &self,
        conversation: ContactConversation,
    ) -> MhResult<ContactConversation>;

    /// Fetch a conversation by id.
    fn find_conversation(&self, id: &str) -> MhResult<Option<ContactConversation>>;

    /// The live (non-deleted) conversation between the unordered pair,
    /// whichever way round the participants were stored.
    fn find_conversation_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> MhResult<Option<ContactConversation>>;

    /// Write back a previously loaded conversation.
    fn update_conversation(&self, conversation: &mut ContactConversation) -> MhResult<()>;

    /// All non-deleted conversations the user participates in, ordered
    /// by last activity (last message, falling back to creation),
    /// newest first. Per-user archive filtering happens in the service.
    fn list_conversations_for(&self, user_id: &str) -> MhResult<Vec<ContactConversation>>;

    // ─── Messages ───────────────────────────────────────────────────────

    /// Insert a message.
    fn insert_message(&self, message: ContactMessage) -> MhResult<ContactMessage>;

    /// Fetch a message by id.
    fn find_message(&self, id: &str) -> MhResult<Option<ContactMessage>>;

    /// Write back a message's read-state.
    fn update_message(&self, message: &ContactMessage) -> MhResult<()>;

    /// Transcript of the conversation, oldest first.
    fn list_messages(&self, conversation_id: &str) -> MhResult<Vec<ContactMessage>>;

    // ─── Notifications ──────────────────────────────────────────────────

    /// Insert a notification.
    fn insert_notification(
        &self,
        notification: ContactNotification,
    ) -> MhResult<ContactNotification>;

    /// Fetch a notification by id.
    fn find_notification(&self, id: &str) -> MhResult<Option<ContactNotification>>;

    /// Write back a notification's read-state.
    fn update_notification(&self, notification: &ContactNotification) -> MhResult<()>;

    /// The user's notification inbox, newest first.
    fn list_notifications_for(&self, user_id: &str) -> MhResult<Vec<ContactNotification>>;
}
