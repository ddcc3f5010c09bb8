//! Contact settings service.
//!
//! Owns the per-user settings records: lazy creation with permissive
//! defaults, partial updates, and the block list. Also hosts the
//! permission gates the request and message services consult before
//! writing anything, since those gates only read settings.

use std::sync::Arc;
use tracing::{info, debug};

use mh_core::config::ConfigHandle;
use mh_core::error::{MhError, MhResult};
use mh_models::{
    ContactSettings, ContactSettingsPatch, ContactStore, RequestType, UserRef,
};

use crate::event_bus::{AppEvent, EventBus};
use crate::service::{Service, ServiceState};

/// Service managing per-user contact settings and block lists.
pub struct ContactSettingsService {
    state: ServiceState,
    store: Arc<dyn ContactStore>,
    config: ConfigHandle,
    event_bus: EventBus,
}

impl ContactSettingsService {
    /// Create a new ContactSettingsService.
    pub fn new(store: Arc<dyn ContactStore>, config: ConfigHandle, event_bus: EventBus) -> Self {
        Self {
            state: ServiceState::Created,
            store,
            config,
            event_bus,
        }
    }

    /// Fetch a user's settings. Absent means "defaults apply" to callers;
    /// the permission gates below treat a missing record as permissive.
    pub fn get(&self, user_id: &str) -> MhResult<Option<ContactSettings>> {
        self.store.find_settings(user_id)
    }

    /// Apply a partial update to a user's settings, creating the record
    /// with permissive defaults on first write. Omitted patch fields
    /// never overwrite stored values.
    pub async fn upsert(
        &self,
        user_id: &str,
        patch: &ContactSettingsPatch,
    ) -> MhResult<ContactSettings> {
        let settings = match self.store.find_settings(user_id)? {
            Some(mut existing) => {
                patch.apply(&mut existing);
                self.store.update_settings(&mut existing)?;
                existing
            }
            None => {
                let timezone = self.config.read().await.contact.default_timezone.clone();
                let mut fresh = ContactSettings::defaults_for(user_id, &timezone);
                patch.apply(&mut fresh);
                let stored = self.store.insert_settings(fresh)?;
                info!("created contact settings for user {user_id}");
                stored
            }
        };

        self.event_bus.emit(AppEvent::SettingsUpdated {
            user_id: user_id.to_string(),
        });
        Ok(settings)
    }

    /// Add a user to the caller's block list. Blocking requires an
    /// existing settings record; there is no auto-create here.
    /// Idempotent: blocking an already-blocked user is a no-op.
    pub fn block(&self, user_id: &str, target_id: &str) -> MhResult<ContactSettings> {
        let mut settings = self
            .store
            .find_settings(user_id)?
            .ok_or_else(|| MhError::SettingsNotFound(user_id.to_string()))?;

        if settings.add_block(target_id) {
            self.store.update_settings(&mut settings)?;
            info!("user {user_id} blocked {target_id}");
            self.event_bus.emit(AppEvent::UserBlocked {
                user_id: user_id.to_string(),
                blocked_id: target_id.to_string(),
            });
        } else {
            debug!("user {user_id} already blocks {target_id}");
        }
        Ok(settings)
    }

    /// Remove a user from the caller's block list. Idempotent.
    pub fn unblock(&self, user_id: &str, target_id: &str) -> MhResult<ContactSettings> {
        let mut settings = self
            .store
            .find_settings(user_id)?
            .ok_or_else(|| MhError::SettingsNotFound(user_id.to_string()))?;

        if settings.remove_block(target_id) {
            self.store.update_settings(&mut settings)?;
            info!("user {user_id} unblocked {target_id}");
            self.event_bus.emit(AppEvent::UserUnblocked {
                user_id: user_id.to_string(),
                blocked_id: target_id.to_string(),
            });
        } else {
            debug!("user {user_id} does not block {target_id}");
        }
        Ok(settings)
    }

    // ─── Permission gates ───────────────────────────────────────────────

    /// Whether the requester may send a contact request to the target.
    ///
    /// A block always wins; a whitelisted requester bypasses the
    /// permission flags but not a block. Missing settings mean the
    /// permissive defaults: allowed.
    pub fn authorize_request(
        &self,
        requester: &UserRef,
        target_id: &str,
        request_type: RequestType,
    ) -> MhResult<()> {
        let Some(settings) = self.store.find_settings(target_id)? else {
            return Ok(());
        };

        if settings.is_blocked(&requester.id) {
            return Err(MhError::SenderBlocked {
                sender: requester.id.clone(),
                target: target_id.to_string(),
            });
        }
        if settings.is_whitelisted(&requester.id) {
            return Ok(());
        }
        if !settings.allow_contact_requests {
            return Err(MhError::ContactRequestsDisabled(target_id.to_string()));
        }
        if request_type == RequestType::MeetingRequest && !settings.allow_meeting_requests {
            return Err(MhError::MeetingRequestsDisabled(target_id.to_string()));
        }
        if !settings.role_permissions.allows(requester.role) {
            return Err(MhError::RoleContactDisabled {
                user_id: target_id.to_string(),
                role: requester.role.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// Whether the sender may direct-message the recipient. Same
    /// block/whitelist precedence as `authorize_request`.
    pub fn authorize_message(&self, sender_id: &str, recipient_id: &str) -> MhResult<()> {
        let Some(settings) = self.store.find_settings(recipient_id)? else {
            return Ok(());
        };

        if settings.is_blocked(sender_id) {
            return Err(MhError::SenderBlocked {
                sender: sender_id.to_string(),
                target: recipient_id.to_string(),
            });
        }
        if settings.is_whitelisted(sender_id) {
            return Ok(());
        }
        if !settings.allow_direct_messages {
            return Err(MhError::DirectMessagesDisabled(recipient_id.to_string()));
        }
        Ok(())
    }
}

impl Service for ContactSettingsService {
    fn name(&self) -> &str { "contact_settings" }
    fn state(&self) -> ServiceState { self.state }
    fn init(&mut self) -> MhResult<()> {
        self.state = ServiceState::Running;
        info!("contact settings service initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> MhResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}
