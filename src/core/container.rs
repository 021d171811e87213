//! Host service container
//!
//! Bundles the host collaborators a worker needs so that they are passed in
//! explicitly at construction instead of being reached through globals.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    error::{WorkerError, WorkerResult},
    traits::{CacheStorage, ClientInfo, Clients, Network, Notifier, PushManager},
};
use crate::{
    notification::NotificationOptions,
    push::{PushSubscription, SubscriptionOptions},
    worker::messages::WorkerMessage,
};

/// Main dependency container for a worker instance
#[derive(Clone)]
pub struct HostContainer {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: Arc<dyn Clients>,
    notifier: Arc<dyn Notifier>,
    push_manager: Arc<dyn PushManager>,
}

impl HostContainer {
    /// Container with a store and a network; page, notification and push
    /// facilities are absent.
    pub fn new(storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            storage,
            network,
            clients: Arc::new(NoClients),
            notifier: Arc::new(NoNotifier),
            push_manager: Arc::new(NoPushManager),
        }
    }

    /// Create a container with custom components
    pub fn with_components(
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        clients: Arc<dyn Clients>,
        notifier: Arc<dyn Notifier>,
        push_manager: Arc<dyn PushManager>,
    ) -> Self {
        Self {
            storage,
            network,
            clients,
            notifier,
            push_manager,
        }
    }

    pub fn storage(&self) -> Arc<dyn CacheStorage> {
        self.storage.clone()
    }

    pub fn network(&self) -> Arc<dyn Network> {
        self.network.clone()
    }

    pub fn clients(&self) -> Arc<dyn Clients> {
        self.clients.clone()
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }

    pub fn push_manager(&self) -> Arc<dyn PushManager> {
        self.push_manager.clone()
    }
}

/// Host without any pages.
struct NoClients;

#[async_trait]
impl Clients for NoClients {
    async fn match_all(&self, _include_uncontrolled: bool) -> WorkerResult<Vec<ClientInfo>> {
        Ok(Vec::new())
    }

    async fn claim(&self) -> WorkerResult<()> {
        Ok(())
    }

    async fn focus(&self, client_id: &str) -> WorkerResult<()> {
        Err(WorkerError::Message(format!("no client {client_id}")))
    }

    async fn open_window(&self, url: &str) -> WorkerResult<()> {
        log::debug!("Host has no windows, not opening {url}");
        Ok(())
    }

    async fn post_message(&self, _client_id: &str, _message: &WorkerMessage) -> WorkerResult<()> {
        Ok(())
    }
}

struct NoNotifier;

#[async_trait]
impl Notifier for NoNotifier {
    async fn show_notification(
        &self,
        title: &str,
        _options: &NotificationOptions,
    ) -> WorkerResult<()> {
        log::debug!("Host has no notification support, dropping '{title}'");
        Ok(())
    }

    async fn close_notification(&self, _tag: &str) -> WorkerResult<()> {
        Ok(())
    }
}

struct NoPushManager;

#[async_trait]
impl PushManager for NoPushManager {
    async fn subscribe(&self, _options: &SubscriptionOptions) -> WorkerResult<PushSubscription> {
        Err(WorkerError::Push("push is not supported by this host".to_string()))
    }
}
