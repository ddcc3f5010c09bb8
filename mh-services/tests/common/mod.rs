//! Shared test utilities for integration tests.

use std::sync::Arc;

use mh_core::config::{AppConfig, ConfigHandle};
use mh_models::db::Database;
use mh_models::{
    ContactMessageDraft, ContactRequestDraft, ContactRole, ContactStore, MemoryStore,
    MessageType, Priority, RequestType, SqliteStore, UserRef,
};
use mh_services::conversation::ConversationService;
use mh_services::event_bus::EventBus;
use mh_services::message::MessageService;
use mh_services::notification::NotificationService;
use mh_services::request::ContactRequestService;
use mh_services::settings::ContactSettingsService;
use tempfile::TempDir;

/// The five services wired over a shared store and bus.
pub struct Services {
    pub settings: ContactSettingsService,
    pub requests: ContactRequestService,
    pub conversations: ConversationService,
    pub messages: MessageService,
    pub notifier: NotificationService,
    pub event_bus: EventBus,
}

/// Wire all services over the given store with a default config.
pub fn services_over(store: Arc<dyn ContactStore>) -> Services {
    let config = ConfigHandle::new(AppConfig::default());
    let bus = EventBus::new(64);
    Services {
        settings: ContactSettingsService::new(store.clone(), config.clone(), bus.clone()),
        requests: ContactRequestService::new(store.clone(), config.clone(), bus.clone()),
        conversations: ConversationService::new(store.clone(), bus.clone()),
        messages: MessageService::new(store.clone(), bus.clone()),
        notifier: NotificationService::new(store, config, bus.clone()),
        event_bus: bus,
    }
}

/// An in-memory store.
pub fn memory_store() -> Arc<dyn ContactStore> {
    Arc::new(MemoryStore::new())
}

/// A SQLite store over a temp-dir database. The TempDir must be held
/// alive for the duration of the test.
pub fn sqlite_store() -> (Arc<dyn ContactStore>, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test.db");
    let db = Database::init(&path, &mh_core::config::DatabaseConfig::default())
        .expect("failed to init test database");
    (Arc::new(SqliteStore::new(db)), dir)
}

/// A user identity snapshot for tests.
pub fn user(id: &str, role: ContactRole) -> UserRef {
    UserRef::new(id, format!("User {id}"), format!("{id}@example.com"), role)
}

/// A plain text message draft.
pub fn message_draft(sender: &UserRef, recipient: &UserRef, content: &str) -> ContactMessageDraft {
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

/// A general-inquiry contact request draft.
pub fn request_draft(
    requester: &UserRef,
    target: &UserRef,
    subject: &str,
) -> ContactRequestDraft {
    ContactRequestDraft {
        requester: requester.clone(),
        target: target.clone(),
        request_type: RequestType::GeneralInquiry,
        subject: subject.into(),
        message: "I would like to connect".into(),
        priority: Priority::Medium,
        category: "networking".into(),
        scheduled_meeting: None,
    }
}
