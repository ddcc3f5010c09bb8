//! Contact request service.
//!
//! Owns the contact-request lifecycle: gated creation, the single
//! pending -> approved/rejected transition, requester cancellation,
//! completion of approved requests, expiry of stale pending requests,
//! and the filtered, priority-ordered inbox listing.

use std::sync::Arc;
use chrono::{Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, debug, warn};

use mh_core::config::ConfigHandle;
use mh_core::constants::{categories, related};
use mh_core::error::{MhError, MhResult};
use mh_models::store::now_rfc3339;
use mh_models::{
    ContactRequest, ContactRequestDraft, ContactStore, NotificationDraft, NotificationType,
    Priority, RequestStatus, RequestType,
};

use crate::event_bus::{AppEvent, EventBus};
use crate::notification::NotificationService;
use crate::service::{Service, ServiceState};
use crate::settings::ContactSettingsService;

/// The responder's decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestDecision {
    Approved,
    Rejected,
}

impl RequestDecision {
    fn status(&self) -> RequestStatus {
        match self {
            RequestDecision::Approved => RequestStatus::Approved,
            RequestDecision::Rejected => RequestStatus::Rejected,
        }
    }

    fn notification_type(&self) -> NotificationType {
        match self {
            RequestDecision::Approved => NotificationType::ContactApproved,
            RequestDecision::Rejected => NotificationType::ContactRejected,
        }
    }
}

/// Inbox filters for `ContactRequestService::list`. All criteria are
/// conjunctive; `None` means "don't filter on this".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactRequestFilters {
    pub status: Option<Vec<RequestStatus>>,
    pub priority: Option<Vec<Priority>>,
    pub category: Option<String>,
    pub request_type: Option<Vec<RequestType>>,
    /// Case-insensitive substring over subject, message, and requester name.
    pub search: Option<String>,
}

impl ContactRequestFilters {
    fn matches(&self, request: &ContactRequest) -> bool {
        if let Some(ref statuses) = self.status {
            if !statuses.contains(&request.status) {
                return false;
            }
        }
        if let Some(ref priorities) = self.priority {
            if !priorities.contains(&request.priority) {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if !request.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(ref types) = self.request_type {
            if !types.contains(&request.request_type) {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            let haystacks = [
                request.subject.to_lowercase(),
                request.message.to_lowercase(),
                request.requester.name.to_lowercase(),
            ];
            if !haystacks.iter().any(|h| h.contains(&needle)) {
                return false;
            }
        }
        true
    }
}

/// Service managing contact requests.
pub struct ContactRequestService {
    state: ServiceState,
    store: Arc<dyn ContactStore>,
    config: ConfigHandle,
    event_bus: EventBus,
}

impl ContactRequestService {
    /// Create a new ContactRequestService.
    pub fn new(store: Arc<dyn ContactStore>, config: ConfigHandle, event_bus: EventBus) -> Self {
        Self {
            state: ServiceState::Created,
            store,
            config,
            event_bus,
        }
    }

    /// Fetch a request by id.
    pub fn get(&self, request_id: &str) -> MhResult<ContactRequest> {
        self.store
            .find_request(request_id)?
            .ok_or_else(|| MhError::RequestNotFound(request_id.to_string()))
    }

    /// Send a contact request.
    ///
    /// The target's settings gate runs before any write; on refusal
    /// nothing is persisted. On success the request lands pending and
    /// the target is notified best-effort.
    pub async fn send(
        &self,
        settings: &ContactSettingsService,
        notifier: &NotificationService,
        draft: ContactRequestDraft,
    ) -> MhResult<ContactRequest> {
        settings.authorize_request(&draft.requester, &draft.target.id, draft.request_type)?;

        let request = self.store.insert_request(draft.into_request())?;

        info!(
            "contact request {} from {} to {} ({})",
            request.id,
            request.requester.id,
            request.target.id,
            request.request_type.as_str()
        );
        self.event_bus.emit(AppEvent::ContactRequestCreated {
            request_id: request.id.clone(),
            target_id: request.target.id.clone(),
        });

        let notification = NotificationDraft {
            user_id: request.target.id.clone(),
            notification_type: NotificationType::NewContactRequest,
            title: "New contact request".to_string(),
            message: format!("{}: {}", request.requester.name, request.subject),
            related_id: Some(request.id.clone()),
            related_type: Some(related::CONTACT_REQUEST.to_string()),
            priority: request.priority,
            category: categories::CONTACT.to_string(),
            action_required: true,
            action_url: None,
        };
        if let Err(e) = notifier.dispatch(notification).await {
            warn!("failed to notify target of request {}: {e}", request.id);
        }

        Ok(request)
    }

    /// Approve or reject a pending request.
    ///
    /// Only pending requests may be responded to; responding to one in
    /// any other state fails with `InvalidStateTransition` and leaves
    /// the stored status untouched. The requester is notified of the
    /// outcome best-effort.
    pub async fn respond(
        &self,
        notifier: &NotificationService,
        request_id: &str,
        responder_id: &str,
        decision: RequestDecision,
        response_message: Option<String>,
    ) -> MhResult<ContactRequest> {
        let mut request = self.get(request_id)?;

        if request.status != RequestStatus::Pending {
            return Err(MhError::InvalidStateTransition(format!(
                "request {request_id} is {} and cannot be responded to",
                request.status.as_str()
            )));
        }

        request.status = decision.status();
        request.response_message = response_message;
        request.responded_at = Some(now_rfc3339());
        request.responded_by = Some(responder_id.to_string());
        self.store.update_request(&mut request)?;

        info!(
            "contact request {request_id} {} by {responder_id}",
            request.status.as_str()
        );
        self.event_bus.emit(AppEvent::ContactRequestResponded {
            request_id: request_id.to_string(),
            requester_id: request.requester.id.clone(),
            status: request.status,
        });

        let outcome = match decision {
            RequestDecision::Approved => "approved",
            RequestDecision::Rejected => "declined",
        };
        let notification = NotificationDraft {
            user_id: request.requester.id.clone(),
            notification_type: decision.notification_type(),
            title: format!("Contact request {outcome}"),
            message: format!("{} {outcome} your request: {}", request.target.name, request.subject),
            related_id: Some(request.id.clone()),
            related_type: Some(related::CONTACT_REQUEST.to_string()),
            priority: request.priority,
            category: categories::CONTACT.to_string(),
            action_required: false,
            action_url: None,
        };
        if let Err(e) = notifier.dispatch(notification).await {
            warn!("failed to notify requester of response to {request_id}: {e}");
        }

        Ok(request)
    }

    /// Withdraw a pending request. Only the requester may cancel, and
    /// only while the request is still pending.
    pub fn cancel(&self, request_id: &str, requester_id: &str) -> MhResult<ContactRequest> {
        let mut request = self.get(request_id)?;

        if request.requester.id != requester_id {
            return Err(MhError::Service(format!(
                "user {requester_id} is not the requester of {request_id}"
            )));
        }
        if request.status != RequestStatus::Pending {
            return Err(MhError::InvalidStateTransition(format!(
                "request {request_id} is {} and cannot be cancelled",
                request.status.as_str()
            )));
        }

        request.status = RequestStatus::Cancelled;
        self.store.update_request(&mut request)?;

        info!("contact request {request_id} cancelled by {requester_id}");
        self.event_bus.emit(AppEvent::ContactRequestCancelled {
            request_id: request_id.to_string(),
        });
        Ok(request)
    }

    /// Mark an approved request as completed (fulfilled).
    pub fn complete(&self, request_id: &str) -> MhResult<ContactRequest> {
        let mut request = self.get(request_id)?;

        if request.status != RequestStatus::Approved {
            return Err(MhError::InvalidStateTransition(format!(
                "request {request_id} is {} and cannot be completed",
                request.status.as_str()
            )));
        }

        request.status = RequestStatus::Completed;
        self.store.update_request(&mut request)?;

        info!("contact request {request_id} completed");
        Ok(request)
    }

    /// Expire pending requests older than the configured window.
    /// Returns how many were expired.
    pub async fn expire_stale(&self) -> MhResult<usize> {
        let days = self.config.read().await.contact.request_expiry_days;
        let cutoff = (Utc::now() - Duration::days(days as i64))
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut expired = 0;
        for mut request in self.store.list_requests_with_status(RequestStatus::Pending)? {
            if request.created_at < cutoff {
                request.status = RequestStatus::Expired;
                self.store.update_request(&mut request)?;
                self.event_bus.emit(AppEvent::ContactRequestExpired {
                    request_id: request.id.clone(),
                });
                expired += 1;
            }
        }

        if expired > 0 {
            info!("expired {expired} stale contact requests (older than {days} days)");
        } else {
            debug!("no stale contact requests to expire");
        }
        Ok(expired)
    }

    /// The target's inbox: requests addressed to the user, filtered and
    /// sorted by priority descending (urgent > high > medium > low),
    /// newest first within equal priority.
    pub fn list(
        &self,
        user_id: &str,
        filters: &ContactRequestFilters,
    ) -> MhResult<Vec<ContactRequest>> {
        let mut requests: Vec<ContactRequest> = self
            .store
            .list_requests_for_target(user_id)?
            .into_iter()
            .filter(|r| filters.matches(r))
            .collect();

        // The store returns newest-first; a stable sort on priority rank
        // keeps that recency order within each priority band.
        requests.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));
        Ok(requests)
    }
}

impl Service for ContactRequestService {
    fn name(&self) -> &str { "contact_request" }
    fn state(&self) -> ServiceState { self.state }
    fn init(&mut self) -> MhResult<()> {
        self.state = ServiceState::Running;
        info!("contact request service initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> MhResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}
