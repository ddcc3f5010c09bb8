//! Global error types for the MentorHub contact subsystem.
//!
//! All error categories across the workspace are unified into a single
//! `MhError` enum with conversions from underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using MhError.
pub type MhResult<T> = Result<T, MhError>;

/// Unified error type covering all error categories in MentorHub.
#[derive(Error, Debug)]
pub enum MhError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Database errors --
    /// SQLite database error.
    #[error("database error: {0}")]
    Database(String),

    /// Database migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// Database connection pool error.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Database integrity check failed.
    #[error("database integrity check failed: {0}")]
    IntegrityCheck(String),

    // -- Permission errors --
    /// The target user has contact requests switched off.
    #[error("contact requests disabled for user {0}")]
    ContactRequestsDisabled(String),

    /// The recipient has direct messages switched off.
    #[error("direct messages disabled for user {0}")]
    DirectMessagesDisabled(String),

    /// The target user has meeting requests switched off.
    #[error("meeting requests disabled for user {0}")]
    MeetingRequestsDisabled(String),

    /// The target user does not accept contact from the sender's role.
    #[error("user {user_id} does not accept contact from {role} accounts")]
    RoleContactDisabled {
        /// The user whose settings refused the contact.
        user_id: String,
        /// The refused role, as a lowercase string.
        role: String,
    },

    /// The sender is on the target's block list.
    #[error("user {sender} is blocked by {target}")]
    SenderBlocked {
        /// The blocked sender/requester.
        sender: String,
        /// The user whose block list matched.
        target: String,
    },

    // -- Domain state errors --
    /// Block/unblock was attempted for a user with no settings record.
    #[error("no contact settings exist for user {0}")]
    SettingsNotFound(String),

    /// An entity was asked to transition out of a state that does not
    /// permit the transition (e.g. responding to a non-pending request).
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Contact request not found.
    #[error("contact request not found: {0}")]
    RequestNotFound(String),

    /// Conversation not found.
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    /// Message not found.
    #[error("message not found: {0}")]
    MessageNotFound(String),

    /// Notification not found.
    #[error("notification not found: {0}")]
    NotificationNotFound(String),

    /// The named user is not a participant of the conversation.
    #[error("user {user_id} is not a participant of conversation {conversation_id}")]
    NotAParticipant {
        /// The offending caller.
        user_id: String,
        /// The conversation they tried to act on.
        conversation_id: String,
    },

    // -- Side-effect errors --
    /// Notification dispatch failed. Callers of the primary operations
    /// log and swallow this; it never propagates past a service boundary.
    #[error("notification dispatch error: {0}")]
    Notification(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Service errors --
    /// A service failed to initialize.
    #[error("service init error: {0}")]
    ServiceInit(String),

    /// A service is not yet initialized.
    #[error("service not initialized: {0}")]
    ServiceNotInitialized(String),

    /// A service operation failed.
    #[error("service error: {0}")]
    Service(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MhError {
    /// Whether this error is a permission refusal (recoverable, surfaced
    /// to the end user rather than treated as a fault).
    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            MhError::ContactRequestsDisabled(_)
                | MhError::DirectMessagesDisabled(_)
                | MhError::MeetingRequestsDisabled(_)
                | MhError::RoleContactDisabled { .. }
                | MhError::SenderBlocked { .. }
        )
    }
}

impl From<serde_json::Error> for MhError {
    fn from(e: serde_json::Error) -> Self {
        MhError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for MhError {
    fn from(e: toml::de::Error) -> Self {
        MhError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MhError::ContactRequestsDisabled("user-1".to_string());
        assert_eq!(err.to_string(), "contact requests disabled for user user-1");

        let err = MhError::SenderBlocked {
            sender: "a".into(),
            target: "b".into(),
        };
        assert_eq!(err.to_string(), "user a is blocked by b");
    }

    #[test]
    fn test_permission_denied_classification() {
        assert!(MhError::DirectMessagesDisabled("u".into()).is_permission_denied());
        assert!(MhError::SenderBlocked { sender: "a".into(), target: "b".into() }
            .is_permission_denied());
        assert!(!MhError::SettingsNotFound("u".into()).is_permission_denied());
        assert!(!MhError::Database("boom".into()).is_permission_denied());
    }

    #[test]
    fn test_serde_json_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: MhError = parse_err.into();
        assert!(matches!(err, MhError::Serialization(_)));
    }
}
