//! Core traits for the worker
//!
//! These are the seams between the caching policy and whatever hosts it:
//! the persistent store, the network, the controlled pages and the
//! notification/push facilities.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::WorkerResult;
use crate::{
    fetch::{CacheKey, FetchRequest, FetchResponse},
    notification::NotificationOptions,
    push::{PushSubscription, SubscriptionOptions},
    worker::messages::WorkerMessage,
};

/// A single named store of request/response pairs.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Name the store was opened under
    fn name(&self) -> &str;

    /// Look up the stored response for a key
    async fn match_key(&self, key: &CacheKey) -> WorkerResult<Option<FetchResponse>>;

    /// Insert or replace a single entry (last write wins)
    async fn put(&self, key: CacheKey, response: FetchResponse) -> WorkerResult<()>;

    /// Insert a batch of entries so that readers observe either none or all of them
    async fn put_all(&self, entries: Vec<(CacheKey, FetchResponse)>) -> WorkerResult<()>;

    /// Remove an entry, returning whether it existed
    async fn delete(&self, key: &CacheKey) -> WorkerResult<bool>;

    /// List stored keys
    async fn keys(&self) -> WorkerResult<Vec<CacheKey>>;
}

/// The set of named stores owned by the origin.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it if absent
    async fn open(&self, name: &str) -> WorkerResult<Arc<dyn Cache>>;

    async fn has(&self, name: &str) -> WorkerResult<bool>;

    /// Delete a store, returning whether it existed
    async fn delete(&self, name: &str) -> WorkerResult<bool>;

    /// Names of every store, in creation order
    async fn keys(&self) -> WorkerResult<Vec<String>>;

    /// Search every store in creation order and return the first hit
    async fn match_any(&self, key: &CacheKey) -> WorkerResult<Option<FetchResponse>>;
}

/// Outbound network access.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request. Any HTTP status is a successful fetch; only a
    /// transport failure is an error.
    async fn fetch(&self, request: &FetchRequest) -> WorkerResult<FetchResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Window,
    Worker,
    Sharedworker,
}

/// A page or worker instance belonging to the origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: String,
    pub url: String,
    pub client_type: ClientType,
    /// Whether this worker currently controls the client
    pub controlled: bool,
}

/// Access to the pages of the origin.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Window clients, optionally including those not controlled by this worker
    async fn match_all(&self, include_uncontrolled: bool) -> WorkerResult<Vec<ClientInfo>>;

    /// Take control of every client in scope
    async fn claim(&self) -> WorkerResult<()>;

    async fn focus(&self, client_id: &str) -> WorkerResult<()>;

    async fn open_window(&self, url: &str) -> WorkerResult<()>;

    async fn post_message(&self, client_id: &str, message: &WorkerMessage) -> WorkerResult<()>;
}

/// System notification display.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show_notification(&self, title: &str, options: &NotificationOptions)
        -> WorkerResult<()>;

    async fn close_notification(&self, tag: &str) -> WorkerResult<()>;
}

/// Push subscription management provided by the host.
#[async_trait]
pub trait PushManager: Send + Sync {
    async fn subscribe(&self, options: &SubscriptionOptions) -> WorkerResult<PushSubscription>;
}
