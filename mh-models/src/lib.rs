//! MentorHub Models - Database schema, entity models, migrations, and stores.
//!
//! This crate owns all data persistence for the contact subsystem: SQLite
//! database initialization, the five contact entities, versioned migrations,
//! the `ContactStore` persistence port, and its SQLite and in-memory
//! implementations.

pub mod db;
pub mod schema;
pub mod models;
pub mod migrations;
pub mod store;
pub mod sqlite;
pub mod memory;

// Re-export key types
pub use db::{Database, DbPool};
pub use models::common::{ContactRole, Priority, UserRef};
pub use models::settings::{ContactSettings, ContactSettingsPatch, PrivacyLevel, RolePermissions};
pub use models::request::{ContactRequest, ContactRequestDraft, RequestStatus, RequestType};
pub use models::conversation::{
    ContactConversation, ConversationStatus, ConversationType, ParticipantSlot,
};
pub use models::message::{ContactMessage, ContactMessageDraft, MessageAttachment, MessageType};
pub use models::notification::{ContactNotification, NotificationDraft, NotificationType};
pub use store::ContactStore;
pub use sqlite::SqliteStore;
pub use memory::MemoryStore;
