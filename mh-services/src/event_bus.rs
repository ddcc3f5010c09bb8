//! Typed event bus for intra-service communication.
//!
//! Uses tokio broadcast channels to decouple services from one another.
//! Any service can emit events without knowing who is listening, and any
//! number of subscribers can independently consume events.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use mh_models::RequestStatus;

/// All application-level event types that flow through the event bus.
///
/// These represent committed state changes: services emit them only
/// after a successful store write, so subscribers (UI caches, audit
/// sinks) can refresh without re-deriving what happened.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A user's contact settings were created or updated.
    SettingsUpdated {
        user_id: String,
    },
    /// A user added someone to their block list.
    UserBlocked {
        user_id: String,
        blocked_id: String,
    },
    /// A user removed someone from their block list.
    UserUnblocked {
        user_id: String,
        blocked_id: String,
    },
    /// A new contact request was persisted.
    ContactRequestCreated {
        request_id: String,
        target_id: String,
    },
    /// A pending contact request was approved or rejected.
    ContactRequestResponded {
        request_id: String,
        requester_id: String,
        status: RequestStatus,
    },
    /// A pending contact request was withdrawn by its requester.
    ContactRequestCancelled {
        request_id: String,
    },
    /// A pending contact request aged out.
    ContactRequestExpired {
        request_id: String,
    },
    /// A new conversation was created.
    ConversationCreated {
        conversation_id: String,
    },
    /// A conversation's summary, counters, or flags changed.
    ConversationUpdated {
        conversation_id: String,
    },
    /// One participant archived or unarchived a conversation.
    ConversationArchived {
        conversation_id: String,
        user_id: String,
        archived: bool,
    },
    /// A conversation was soft-deleted.
    ConversationDeleted {
        conversation_id: String,
    },
    /// A message was persisted into a conversation.
    MessageSent {
        message_id: String,
        conversation_id: String,
        recipient_id: String,
    },
    /// A message transitioned to read.
    MessageRead {
        message_id: String,
    },
    /// A notification landed in a user's inbox.
    NotificationCreated {
        notification_id: String,
        user_id: String,
    },
    /// A notification transitioned to read.
    NotificationRead {
        notification_id: String,
    },
}

/// Application-wide event bus backed by a tokio broadcast channel.
///
/// Designed for fan-out delivery: every subscriber gets every event.
/// Slow subscribers that fall behind will receive a `Lagged` error
/// and may miss events, which is acceptable for UI-driven consumers.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<AppEvent>>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    ///
    /// A capacity of 256 is recommended. Events beyond this limit will
    /// cause slow subscribers to lag and miss events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Subscribe to receive application events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: AppEvent) {
        let label = event_label(&event);
        match self.sender.send(event) {
            Ok(count) => {
                debug!("event_bus: emitted {label} to {count} subscriber(s)");
            }
            Err(_) => {
                debug!("event_bus: no subscribers for {label}");
            }
        }
    }

    /// Get the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Human-readable label for an event (for logging).
fn event_label(event: &AppEvent) -> &'static str {
    match event {
        AppEvent::SettingsUpdated { .. } => "SettingsUpdated",
        AppEvent::UserBlocked { .. } => "UserBlocked",
        AppEvent::UserUnblocked { .. } => "UserUnblocked",
        AppEvent::ContactRequestCreated { .. } => "ContactRequestCreated",
        AppEvent::ContactRequestResponded { .. } => "ContactRequestResponded",
        AppEvent::ContactRequestCancelled { .. } => "ContactRequestCancelled",
        AppEvent::ContactRequestExpired { .. } => "ContactRequestExpired",
        AppEvent::ConversationCreated { .. } => "ConversationCreated",
        AppEvent::ConversationUpdated { .. } => "ConversationUpdated",
        AppEvent::ConversationArchived { .. } => "ConversationArchived",
        AppEvent::ConversationDeleted { .. } => "ConversationDeleted",
        AppEvent::MessageSent { .. } => "MessageSent",
        AppEvent::MessageRead { .. } => "MessageRead",
        AppEvent::NotificationCreated { .. } => "NotificationCreated",
        AppEvent::NotificationRead { .. } => "NotificationRead",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(AppEvent::ConversationUpdated {
            conversation_id: "conv-1".into(),
        });

        let event = rx.recv().await.unwrap();
        match event {
            AppEvent::ConversationUpdated { conversation_id } => {
                assert_eq!(conversation_id, "conv-1")
            }
            _ => panic!("unexpected event type"),
        }
    }

    #[tokio::test]
    async fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(AppEvent::MessageRead {
            message_id: "msg-1".into(),
        });

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();

        assert!(matches!(e1, AppEvent::MessageRead { .. }));
        assert!(matches!(e2, AppEvent::MessageRead { .. }));
    }

    #[tokio::test]
    async fn test_event_bus_no_subscribers() {
        let bus = EventBus::new(16);
        // Should not panic even with no subscribers
        bus.emit(AppEvent::SettingsUpdated {
            user_id: "u-1".into(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_labels() {
        assert_eq!(
            event_label(&AppEvent::ContactRequestCreated {
                request_id: String::new(),
                target_id: String::new(),
            }),
            "ContactRequestCreated"
        );
        assert_eq!(
            event_label(&AppEvent::NotificationRead {
                notification_id: String::new()
            }),
            "NotificationRead"
        );
    }
}
