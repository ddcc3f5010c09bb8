//! Notification service for the per-user inbox.
//!
//! Persists notification records as a side effect of request and message
//! events. Dispatch is best-effort: the calling service logs and swallows
//! failures, so a broken inbox never fails a send or a response.

use std::sync::Arc;
use tracing::{info, debug};

use mh_core::config::ConfigHandle;
use mh_core::error::{MhError, MhResult};
use mh_models::{ContactNotification, ContactStore, NotificationDraft};

use crate::event_bus::{AppEvent, EventBus};
use crate::service::{Service, ServiceState};

/// Service managing the notification inbox.
pub struct NotificationService {
    state: ServiceState,
    store: Arc<dyn ContactStore>,
    config: ConfigHandle,
    event_bus: EventBus,
}

impl NotificationService {
    /// Create a new NotificationService.
    pub fn new(store: Arc<dyn ContactStore>, config: ConfigHandle, event_bus: EventBus) -> Self {
        Self {
            state: ServiceState::Created,
            store,
            config,
            event_bus,
        }
    }

    /// Persist a notification into the recipient's inbox.
    ///
    /// Returns `Ok(None)` without writing when notifications are disabled
    /// in configuration. Errors are wrapped as `MhError::Notification` so
    /// callers can recognize and swallow them.
    pub async fn dispatch(&self, draft: NotificationDraft) -> MhResult<Option<ContactNotification>> {
        if !self.config.read().await.contact.notifications_enabled {
            debug!("notifications disabled, skipping dispatch to {}", draft.user_id);
            return Ok(None);
        }

        let notification = self
            .store
            .insert_notification(draft.into_notification())
            .map_err(|e| MhError::Notification(e.to_string()))?;

        debug!(
            "notification {} ({}) dispatched to {}",
            notification.id,
            notification.notification_type.as_str(),
            notification.user_id
        );
        self.event_bus.emit(AppEvent::NotificationCreated {
            notification_id: notification.id.clone(),
            user_id: notification.user_id.clone(),
        });
        Ok(Some(notification))
    }

    /// Mark a notification as read. Idempotent: `read_at` is stamped on
    /// the first call only; repeat calls are no-ops, not errors.
    pub fn mark_read(&self, notification_id: &str) -> MhResult<ContactNotification> {
        let mut notification = self
            .store
            .find_notification(notification_id)?
            .ok_or_else(|| MhError::NotificationNotFound(notification_id.to_string()))?;

        if !notification.is_read {
            notification.is_read = true;
            notification.read_at = Some(mh_models::store::now_rfc3339());
            self.store.update_notification(&notification)?;
            self.event_bus.emit(AppEvent::NotificationRead {
                notification_id: notification_id.to_string(),
            });
        }
        Ok(notification)
    }

    /// Mark every unread notification in the user's inbox as read.
    /// Returns how many were newly marked.
    pub fn mark_all_read(&self, user_id: &str) -> MhResult<usize> {
        let now = mh_models::store::now_rfc3339();
        let mut marked = 0;
        for mut notification in self.store.list_notifications_for(user_id)? {
            if !notification.is_read {
                notification.is_read = true;
                notification.read_at = Some(now.clone());
                self.store.update_notification(&notification)?;
                marked += 1;
            }
        }
        if marked > 0 {
            info!("marked {marked} notifications read for user {user_id}");
        }
        Ok(marked)
    }

    /// The user's notification inbox, newest first.
    pub fn list(&self, user_id: &str) -> MhResult<Vec<ContactNotification>> {
        self.store.list_notifications_for(user_id)
    }

    /// Number of unread notifications in the user's inbox.
    pub fn unread_count(&self, user_id: &str) -> MhResult<usize> {
        Ok(self
            .store
            .list_notifications_for(user_id)?
            .iter()
            .filter(|n| !n.is_read)
            .count())
    }
}

impl Service for NotificationService {
    fn name(&self) -> &str { "notification" }
    fn state(&self) -> ServiceState { self.state }
    fn init(&mut self) -> MhResult<()> {
        self.state = ServiceState::Running;
        info!("notification service initialized");
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
    use mh_core::config::AppConfig;
    use mh_models::{MemoryStore, NotificationType, Priority};

    fn make_service(config: AppConfig) -> NotificationService {
        NotificationService::new(
            Arc::new(MemoryStore::new()),
            ConfigHandle::new(config),
            EventBus::new(16),
        )
    }

    fn draft(user_id: &str, title: &str) -> NotificationDraft {
        NotificationDraft {
            user_id: user_id.into(),
            notification_type: NotificationType::System,
            title: title.into(),
            message: "body".into(),
            related_id: None,
            related_type: None,
            priority: Priority::Medium,
            category: "contact".into(),
            action_required: false,
            action_url: None,
        }
    }

    #[tokio::test]
    async fn test_dispatch_and_list() {
        let svc = make_service(AppConfig::default());
        let n = svc.dispatch(draft("u-1", "hello")).await.unwrap().unwrap();
        assert!(!n.is_read);
        assert!(!n.id.is_empty());

        let inbox = svc.list("u-1").unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(svc.unread_count("u-1").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_disabled_is_noop() {
        let mut config = AppConfig::default();
        config.contact.notifications_enabled = false;
        let svc = make_service(config);

        let result = svc.dispatch(draft("u-1", "hello")).await.unwrap();
        assert!(result.is_none());
        assert!(svc.list("u-1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_idempotent() {
        let svc = make_service(AppConfig::default());
        let n = svc.dispatch(draft("u-1", "hello")).await.unwrap().unwrap();

        let first = svc.mark_read(&n.id).unwrap();
        assert!(first.is_read);
        let stamped = first.read_at.clone().unwrap();

        let second = svc.mark_read(&n.id).unwrap();
        assert!(second.is_read);
        assert_eq!(second.read_at.unwrap(), stamped);
    }

    #[tokio::test]
    async fn test_mark_read_unknown_id() {
        let svc = make_service(AppConfig::default());
        let err = svc.mark_read("missing").unwrap_err();
        assert!(matches!(err, MhError::NotificationNotFound(_)));
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let svc = make_service(AppConfig::default());
        for i in 0..3 {
            svc.dispatch(draft("u-1", &format!("n {i}"))).await.unwrap();
        }
        svc.dispatch(draft("u-2", "other inbox")).await.unwrap();

        assert_eq!(svc.mark_all_read("u-1").unwrap(), 3);
        assert_eq!(svc.unread_count("u-1").unwrap(), 0);
        // Second sweep has nothing to do
        assert_eq!(svc.mark_all_read("u-1").unwrap(), 0);
        // Other user untouched
        assert_eq!(svc.unread_count("u-2").unwrap(), 1);
    }
}
