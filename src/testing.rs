//! In-process doubles for the host facilities.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use http::StatusCode;

use crate::{
    core::{
        ClientInfo, ClientType, Clients, Network, Notifier, PushManager, WorkerError, WorkerResult,
    },
    fetch::{FetchRequest, FetchResponse},
    notification::NotificationOptions,
    push::{PushSubscription, SubscriptionOptions},
    worker::messages::WorkerMessage,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Network with scripted responses keyed by absolute URL. Unknown URLs get
/// a 404; URLs marked as failing, or any URL while offline, fail with a
/// transport error.
#[derive(Default)]
pub struct MockNetwork {
    responses: Mutex<HashMap<String, FetchResponse>>,
    failing: Mutex<Vec<String>>,
    offline: AtomicBool,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: StatusCode, body: &str) {
        let response = FetchResponse::new(status, body.to_string()).with_url(url);
        self.respond_with(url, response);
    }

    pub fn respond_with(&self, url: &str, response: FetchResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().push(url.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of requests seen for a URL.
    pub fn hits(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.to_string() == url)
            .count()
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &FetchRequest) -> WorkerResult<FetchResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let url = request.url.to_string();

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&url) {
            return Err(WorkerError::Network(format!("failed to fetch {url}")));
        }

        let response = self.responses.lock().unwrap().get(&url).cloned();
        Ok(response.unwrap_or_else(|| {
            FetchResponse::new(StatusCode::NOT_FOUND, "not found").with_url(url)
        }))
    }
}

#[derive(Default)]
pub struct RecordingClients {
    pub clients: Mutex<Vec<ClientInfo>>,
    pub claimed: AtomicBool,
    pub focused: Mutex<Vec<String>>,
    pub opened: Mutex<Vec<String>>,
    pub messages: Mutex<Vec<(String, WorkerMessage)>>,
}

impl RecordingClients {
    pub fn with_window(id: &str, url: &str) -> Self {
        let clients = Self::default();
        clients.clients.lock().unwrap().push(ClientInfo {
            id: id.to_string(),
            url: url.to_string(),
            client_type: ClientType::Window,
            controlled: false,
        });
        clients
    }
}

#[async_trait]
impl Clients for RecordingClients {
    async fn match_all(&self, include_uncontrolled: bool) -> WorkerResult<Vec<ClientInfo>> {
        Ok(self
            .clients
            .lock()
            .unwrap()
            .iter()
            .filter(|c| include_uncontrolled || c.controlled)
            .cloned()
            .collect())
    }

    async fn claim(&self) -> WorkerResult<()> {
        self.claimed.store(true, Ordering::SeqCst);
        for client in self.clients.lock().unwrap().iter_mut() {
            client.controlled = true;
        }
        Ok(())
    }

    async fn focus(&self, client_id: &str) -> WorkerResult<()> {
        self.focused.lock().unwrap().push(client_id.to_string());
        Ok(())
    }

    async fn open_window(&self, url: &str) -> WorkerResult<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn post_message(&self, client_id: &str, message: &WorkerMessage) -> WorkerResult<()> {
        self.messages
            .lock()
            .unwrap()
            .push((client_id.to_string(), message.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<(String, NotificationOptions)>>,
    pub closed: Mutex<Vec<String>>,
    pub fail_close: AtomicBool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show_notification(
        &self,
        title: &str,
        options: &NotificationOptions,
    ) -> WorkerResult<()> {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), options.clone()));
        Ok(())
    }

    async fn close_notification(&self, tag: &str) -> WorkerResult<()> {
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(WorkerError::Internal(format!("notification {tag} is gone")));
        }
        self.closed.lock().unwrap().push(tag.to_string());
        Ok(())
    }
}

/// Hands out a fixed subscription and records the options it was asked for.
#[derive(Default)]
pub struct MockPushManager {
    pub requested: Mutex<Vec<SubscriptionOptions>>,
}

#[async_trait]
impl PushManager for MockPushManager {
    async fn subscribe(&self, options: &SubscriptionOptions) -> WorkerResult<PushSubscription> {
        self.requested.lock().unwrap().push(options.clone());
        Ok(PushSubscription {
            endpoint: "https://push.test/renewed".to_string(),
            expiration_time: None,
            keys: [("auth".to_string(), "secret".to_string())]
                .into_iter()
                .collect(),
            options: options.clone(),
        })
    }
}
