//! SQLite-backed implementation of the `ContactStore` port.
//!
//! All queries use parameterized SQL and return domain model types via
//! the models' `from_row` constructors. Ordering guarantees from the
//! port contract are pushed into SQL.

use rusqlite::params;

use mh_core::error::{MhError, MhResult};

use crate::db::Database;
use crate::models::settings::ContactSettings;
use crate::models::request::{ContactRequest, RequestStatus};
use crate::models::conversation::ContactConversation;
use crate::models::message::ContactMessage;
use crate::models::notification::ContactNotification;
use crate::store::{fresh_id, now_rfc3339, ContactStore};

/// Production store over the pooled SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    database: Database,
}

impl SqliteStore {
    /// Create a store over an initialized database.
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Access the underlying database (stats, maintenance).
    pub fn database(&self) -> &Database {
        &self.database
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

impl ContactStore for SqliteStore {
    // ─── Contact settings ───────────────────────────────────────────────

    fn find_settings(&self, user_id: &str) -> MhResult<Option<ContactSettings>> {
        let conn = self.database.conn()?;
        match conn.query_row(
            "SELECT * FROM contact_settings WHERE user_id = ?1",
            [user_id],
            ContactSettings::from_row,
        ) {
            Ok(settings) => Ok(Some(settings)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MhError::Database(e.to_string())),
        }
    }

    fn insert_settings(&self, mut settings: ContactSettings) -> MhResult<ContactSettings> {
        stamp_new(&mut settings.id, &mut settings.created_at);
        settings.updated_at = settings.created_at.clone();

        let conn = self.database.conn()?;
        settings.insert(&conn)?;
        Ok(settings)
    }

    fn update_settings(&self, settings: &mut ContactSettings) -> MhResult<()> {
        settings.updated_at = now_rfc3339();
        let conn = self.database.conn()?;
        settings.update(&conn)
    }

    // ─── Contact requests ───────────────────────────────────────────────

    fn insert_request(&self, mut request: ContactRequest) -> MhResult<ContactRequest> {
        stamp_new(&mut request.id, &mut request.created_at);
        request.updated_at = request.created_at.clone();

        let conn = self.database.conn()?;
        request.insert(&conn)?;
        Ok(request)
    }

    fn find_request(&self, id: &str) -> MhResult<Option<ContactRequest>> {
        let conn = self.database.conn()?;
        match conn.query_row(
            "SELECT * FROM contact_requests WHERE id = ?1",
            [id],
            ContactRequest::from_row,
        ) {
            Ok(request) => Ok(Some(request)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MhError::Database(e.to_string())),
        }
    }

    fn update_request(&self, request: &mut ContactRequest) -> MhResult<()> {
        request.updated_at = now_rfc3339();
        let conn = self.database.conn()?;
        request.update(&conn)
    }

    fn list_requests_for_target(&self, user_id: &str) -> MhResult<Vec<ContactRequest>> {
        let conn = self.database.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM contact_requests WHERE target_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(|e| MhError::Database(e.to_string()))?;

        let requests = stmt
            .query_map([user_id], ContactRequest::from_row)
            .map_err(|e| MhError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(requests)
    }

    fn list_requests_with_status(&self, status: RequestStatus) -> MhResult<Vec<ContactRequest>> {
        let conn = self.database.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM contact_requests WHERE status = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )
            .map_err(|e| MhError::Database(e.to_string()))?;

        let requests = stmt
            .query_map([status.as_str()], ContactRequest::from_row)
            .map_err(|e| MhError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(requests)
    }

    // ─── Conversations ──────────────────────────────────────────────────

    fn insert_conversation(
        &self,
        mut conversation: ContactConversation,
    ) -> MhResult<ContactConversation> {
        stamp_new(&mut conversation.id, &mut conversation.created_at);
        conversation.updated_at = conversation.created_at.clone();

        let conn = self.database.conn()?;
        conversation.insert(&conn)?;
        Ok(conversation)
    }

    fn find_conversation(&self, id: &str) -> MhResult<Option<ContactConversation>> {
        let conn = self.database.conn()?;
        match conn.query_row(
            "SELECT * FROM conversations WHERE id = ?1",
            [id],
            ContactConversation::from_row,
        ) {
            Ok(conversation) => Ok(Some(conversation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MhError::Database(e.to_string())),
        }
    }

    fn find_conversation_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> MhResult<Option<ContactConversation>> {
        let conn = self.database.conn()?;
        // The pair is unordered: check both storage orderings.
        match conn.query_row(
            "SELECT * FROM conversations
             WHERE status != 'deleted'
               AND ((participant1_id = ?1 AND participant2_id = ?2)
                 OR (participant1_id = ?2 AND participant2_id = ?1))
             LIMIT 1",
            params![user_a, user_b],
            ContactConversation::from_row,
        ) {
            Ok(conversation) => Ok(Some(conversation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MhError::Database(e.to_string())),
        }
    }

    fn update_conversation(&self, conversation: &mut ContactConversation) -> MhResult<()> {
        conversation.updated_at = now_rfc3339();
        let conn = self.database.conn()?;
        conversation.update(&conn)
    }

    fn list_conversations_for(&self, user_id: &str) -> MhResult<Vec<ContactConversation>> {
        let conn = self.database.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM conversations
                 WHERE status != 'deleted'
                   AND (participant1_id = ?1 OR participant2_id = ?1)
                 ORDER BY COALESCE(last_message_at, created_at) DESC",
            )
            .map_err(|e| MhError::Database(e.to_string()))?;

        let conversations = stmt
            .query_map([user_id], ContactConversation::from_row)
            .map_err(|e| MhError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(conversations)
    }

    // ─── Messages ───────────────────────────────────────────────────────

    fn insert_message(&self, mut message: ContactMessage) -> MhResult<ContactMessage> {
        stamp_new(&mut message.id, &mut message.created_at);

        let conn = self.database.conn()?;
        message.insert(&conn)?;
        Ok(message)
    }

    fn find_message(&self, id: &str) -> MhResult<Option<ContactMessage>> {
        let conn = self.database.conn()?;
        match conn.query_row(
            "SELECT * FROM messages WHERE id = ?1",
            [id],
            ContactMessage::from_row,
        ) {
            Ok(message) => Ok(Some(message)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MhError::Database(e.to_string())),
        }
    }

    fn update_message(&self, message: &ContactMessage) -> MhResult<()> {
        let conn = self.database.conn()?;
        message.update_read_state(&conn)
    }

    fn list_messages(&self, conversation_id: &str) -> MhResult<Vec<ContactMessage>> {
        let conn = self.database.conn()?;
        // rowid tiebreak keeps same-millisecond messages in insert order.
        let mut stmt = conn
            .prepare(
                "SELECT * FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )
            .map_err(|e| MhError::Database(e.to_string()))?;

        let messages = stmt
            .query_map([conversation_id], ContactMessage::from_row)
            .map_err(|e| MhError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(messages)
    }

    // ─── Notifications ──────────────────────────────────────────────────

    fn insert_notification(
        &self,
        mut notification: ContactNotification,
    ) -> MhResult<ContactNotification> {
        stamp_new(&mut notification.id, &mut notification.created_at);

        let conn = self.database.conn()?;
        notification.insert(&conn)?;
        Ok(notification)
    }

    fn find_notification(&self, id: &str) -> MhResult<Option<ContactNotification>> {
        let conn = self.database.conn()?;
        match conn.query_row(
            "SELECT * FROM notifications WHERE id = ?1",
            [id],
            ContactNotification::from_row,
        ) {
            Ok(notification) => Ok(Some(notification)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MhError::Database(e.to_string())),
        }
    }

    fn update_notification(&self, notification: &ContactNotification) -> MhResult<()> {
        let conn = self.database.conn()?;
        notification.update_read_state(&conn)
    }

    fn list_notifications_for(&self, user_id: &str) -> MhResult<Vec<ContactNotification>> {
        let conn = self.database.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM notifications WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(|e| MhError::Database(e.to_string()))?;

        let notifications = stmt
            .query_map([user_id], ContactNotification::from_row)
            .map_err(|e| MhError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(notifications)
    }
}
