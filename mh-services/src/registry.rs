//! Service registry for dependency injection and lifecycle management.
//!
//! The registry holds all services, initializes them in order, and
//! handles ordered shutdown. Core infrastructure (config, store, event
//! bus) is shared by reference so callers can also construct services
//! directly for business use.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, error};

use mh_core::error::{MhError, MhResult};
use mh_core::config::ConfigHandle;
use mh_models::ContactStore;

use crate::service::{Service, ServiceState};
use crate::event_bus::EventBus;
use crate::settings::ContactSettingsService;
use crate::notification::NotificationService;
use crate::conversation::ConversationService;
use crate::message::MessageService;
use crate::request::ContactRequestService;

/// Central service registry that manages the contact services.
///
/// Provides dependency injection by holding shared references to core
/// infrastructure (store, config, event bus) and managing service
/// lifecycle in the correct order.
pub struct ServiceRegistry {
    /// Application configuration.
    pub config: ConfigHandle,
    /// The persistence port shared by all services.
    pub store: Arc<dyn ContactStore>,
    /// Application-level event bus.
    pub event_bus: EventBus,
    /// Registered services in initialization order.
    services: Vec<(String, Arc<RwLock<Box<dyn Service>>>)>,
}

impl ServiceRegistry {
    /// Create a new ServiceRegistry with core infrastructure.
    pub fn new(config: ConfigHandle, store: Arc<dyn ContactStore>) -> Self {
        Self {
            config,
            store,
            event_bus: EventBus::new(256),
            services: Vec::new(),
        }
    }

    /// Register a service. Services are initialized in registration order.
    pub fn register<S: Service + 'static>(&mut self, service: S) {
        let name = service.name().to_string();
        info!("registered service: {name}");
        self.services
            .push((name, Arc::new(RwLock::new(Box::new(service)))));
    }

    /// Register all contact services in dependency order.
    ///
    /// Initialization order:
    /// 1. ContactSettings (store, config) - the permission leaf
    /// 2. Notification (store, config) - side-effect sink
    /// 3. Conversation (store)
    /// 4. Message (store) - depends on settings/conversation/notification
    /// 5. ContactRequest (store, config) - depends on settings/notification
    pub fn register_all(&mut self) {
        let bus = self.event_bus.clone();

        self.register(ContactSettingsService::new(
            self.store.clone(),
            self.config.clone(),
            bus.clone(),
        ));
        self.register(NotificationService::new(
            self.store.clone(),
            self.config.clone(),
            bus.clone(),
        ));
        self.register(ConversationService::new(self.store.clone(), bus.clone()));
        self.register(MessageService::new(self.store.clone(), bus.clone()));
        self.register(ContactRequestService::new(
            self.store.clone(),
            self.config.clone(),
            bus,
        ));

        info!("registered {} contact services", self.services.len());
    }

    /// Initialize all registered services in order.
    pub async fn init_all(&self) -> MhResult<()> {
        info!("initializing {} services", self.services.len());

        for (name, service) in &self.services {
            info!("initializing service: {name}");
            let mut svc = service.write().await;
            if let Err(e) = svc.init() {
                error!("failed to initialize service {name}: {e}");
                return Err(MhError::ServiceInit(format!("{name}: {e}")));
            }
        }

        info!("all services initialized");
        Ok(())
    }

    /// Shut down all services in reverse order.
    pub async fn shutdown_all(&self) -> MhResult<()> {
        info!("shutting down services");

        for (name, service) in self.services.iter().rev() {
            info!("shutting down service: {name}");
            let mut svc = service.write().await;
            if let Err(e) = svc.shutdown() {
                error!("error shutting down service {name}: {e}");
                // Continue shutting down other services
            }
        }

        info!("all services shut down");
        Ok(())
    }

    /// Get a reference to the event bus.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Get the health status of all services.
    pub async fn health_check(&self) -> Vec<(String, ServiceState, bool)> {
        let mut results = Vec::new();
        for (name, service) in &self.services {
            let svc = service.read().await;
            results.push((name.clone(), svc.state(), svc.is_healthy()));
        }
        results
    }

    /// Get the number of registered services.
    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}
