//! The offline caching worker
//!
//! `ServiceWorker` owns the lifecycle state machine and dispatches every
//! host event to the component that handles it. Hosts deliver events one
//! at a time; background work started by an event is registered on the
//! `ExtendableEvent` the host passed in.

pub mod lifecycle;
pub mod messages;


use std::sync::Arc;

use log::{error, info, warn};

use crate::{
    config::Config,
    core::{
        ExtendableEvent, HostContainer, LifecycleStatus, WorkerError, WorkerResult, WorkerState,
    },
    fetch::{FetchRequest, FetchResponse},
    metrics,
    notification::{ClickOutcome, NotificationClick, NotificationPresenter},
    push::{PushSubscription, PushSubscriptionRenewer},
    router::CacheRouter,
    sync::{SyncOutcome, SyncRunner},
};

pub use messages::{ClientMessage, ReplyPort, WorkerMessage};

pub struct ServiceWorker {
    config: Arc<Config>,
    host: HostContainer,
    status: LifecycleStatus,
    router: CacheRouter,
    presenter: NotificationPresenter,
    renewer: PushSubscriptionRenewer,
    sync: SyncRunner,
}

impl ServiceWorker {
    pub fn new(config: Arc<Config>, host: HostContainer) -> WorkerResult<Self> {
        let router = CacheRouter::new(config.clone(), host.storage(), host.network())?;
        let presenter = NotificationPresenter::new(
            config.clone(),
            router.origin().clone(),
            host.notifier(),
            host.clients(),
        );
        // A relative endpoint is served by the worker's own origin.
        let endpoint = config
            .push
            .subscription_endpoint
            .as_deref()
            .map(|e| router.origin().resolve(e).map(|url| url.to_string()))
            .transpose()?;
        let renewer = PushSubscriptionRenewer::new(
            endpoint,
            host.push_manager(),
            host.network(),
        );
        let sync = SyncRunner::new(config.clone(), host.storage());

        Ok(Self {
            status: LifecycleStatus::new(config.worker.skip_waiting),
            config,
            host,
            router,
            presenter,
            renewer,
            sync,
        })
    }

    pub fn state(&self) -> WorkerState {
        self.status.state()
    }

    pub fn version(&self) -> &str {
        &self.config.worker.version
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn router(&self) -> &CacheRouter {
        &self.router
    }

    /// Whether an installed worker may activate now. A waiting worker moves
    /// on once no other worker controls pages, or immediately when skip
    /// waiting was requested.
    pub fn ready_to_activate(&self, other_worker_active: bool) -> bool {
        self.state() == WorkerState::Installed
            && (self.status.skip_waiting() || !other_worker_active)
    }

    /// Precache the app shell. Either every asset lands in the current store
    /// or the worker becomes redundant and no new store is left behind.
    pub async fn install(&self) -> WorkerResult<()> {
        if !self
            .status
            .transition(WorkerState::Parsed, WorkerState::Installing)
        {
            return Err(WorkerError::InvalidState(format!(
                "cannot install a worker in state {}",
                self.state()
            )));
        }

        let cache_name = &self.config.worker.cache_name;
        info!("Installing worker {} into store {}", self.version(), cache_name);

        let storage = self.host.storage();
        let existed = match storage.has(cache_name).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!("Failed to check store {cache_name}: {e}");
                true
            }
        };

        let result = lifecycle::precache(
            storage.clone(),
            self.host.network(),
            self.config.clone(),
            self.config.worker.shell_assets.clone(),
        )
        .await;

        match result {
            Ok(count) => {
                info!("Cached {count} shell assets");
                metrics::record_install(true);
                self.status.set_state(WorkerState::Installed);
                if self.status.skip_waiting() {
                    info!("Skip waiting requested, worker may activate immediately");
                }
                Ok(())
            }
            Err(e) => {
                error!("Install of worker {} failed: {}", self.version(), e);
                metrics::record_install(false);
                if !existed {
                    if let Err(del) = storage.delete(cache_name).await {
                        warn!("Failed to remove store {cache_name} after failed install: {del}");
                    }
                }
                self.status.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    /// Drop stale stores, take control of open pages and tell them about the
    /// new version.
    pub async fn activate(&self) -> WorkerResult<()> {
        if !self
            .status
            .transition(WorkerState::Installed, WorkerState::Activating)
        {
            return Err(WorkerError::InvalidState(format!(
                "cannot activate a worker in state {}",
                self.state()
            )));
        }
        info!("Activating worker {}", self.version());

        let storage = self.host.storage();
        let purged = lifecycle::purge_stale_stores(storage.as_ref(), &self.config.worker).await;
        metrics::record_purged_stores(purged);
        info!("Store cleanup completed, {purged} removed");

        let clients = self.host.clients();
        if let Err(e) = clients.claim().await {
            warn!("Failed to claim clients: {e}");
        }

        let updated = WorkerMessage::SwUpdated {
            version: self.config.worker.version.clone(),
        };
        match clients.match_all(false).await {
            Ok(list) => {
                for client in list {
                    if let Err(e) = clients.post_message(&client.id, &updated).await {
                        warn!("Failed to notify client {}: {}", client.id, e);
                    }
                }
            }
            Err(e) => warn!("Failed to list clients: {e}"),
        }

        self.status.set_state(WorkerState::Activated);
        Ok(())
    }

    /// Answer an intercepted request. `None` means the host should perform
    /// its default fetch.
    pub async fn handle_fetch(
        &self,
        request: &FetchRequest,
        event: &mut ExtendableEvent,
    ) -> WorkerResult<Option<FetchResponse>> {
        if !self.state().can_intercept_fetch() {
            return Ok(None);
        }
        let outcome = self.router.handle(request, event).await?;
        Ok(outcome.into_response())
    }

    pub async fn handle_message(
        &self,
        data: &serde_json::Value,
        reply: Option<&ReplyPort>,
        event: &mut ExtendableEvent,
    ) -> WorkerResult<()> {
        let Some(message) = ClientMessage::parse(data) else {
            info!("Ignoring message {data}");
            return Ok(());
        };

        match message {
            ClientMessage::SkipWaiting => {
                self.status.request_skip_waiting();
                if self.state() == WorkerState::Installed {
                    self.activate().await?;
                }
            }
            ClientMessage::GetVersion => {
                let port = reply.ok_or_else(|| {
                    WorkerError::Message("GET_VERSION requires a reply port".to_string())
                })?;
                let info = WorkerMessage::VersionInfo {
                    version: self.config.worker.version.clone(),
                    cache_name: self.config.worker.cache_name.clone(),
                };
                port.send(info)
                    .map_err(|_| WorkerError::Message("reply port is closed".to_string()))?;
            }
            ClientMessage::WarmCache { urls } => {
                let storage = self.host.storage();
                let network = self.host.network();
                let config = self.config.clone();
                event.wait_until(async move {
                    let count = lifecycle::precache(storage, network, config, urls).await?;
                    info!("Warmed cache with {count} entries");
                    Ok(())
                });
            }
        }
        Ok(())
    }

    pub async fn handle_sync(&self, tag: &str) -> SyncOutcome {
        self.sync.background_sync(tag).await
    }

    pub async fn handle_periodic_sync(&self, tag: &str) -> SyncOutcome {
        self.sync.periodic_sync(tag).await
    }

    pub async fn handle_push(&self, data: Option<&[u8]>) -> WorkerResult<()> {
        self.presenter.show_push(data).await
    }

    pub async fn handle_notification_click(
        &self,
        click: &NotificationClick,
    ) -> WorkerResult<ClickOutcome> {
        self.presenter.handle_click(click).await
    }

    pub async fn handle_push_subscription_change(
        &self,
        old: Option<&PushSubscription>,
    ) -> WorkerResult<PushSubscription> {
        self.renewer.renew(old).await.inspect_err(|e| {
            error!("Push subscription renewal failed: {e}");
        })
    }

    pub fn handle_error(&self, message: &str) {
        error!(event = "error"; "Worker error: {message}");
    }

    pub fn handle_unhandled_rejection(&self, reason: &str) {
        metrics::record_unhandled_rejection("unhandledrejection");
        error!(event = "unhandledrejection"; "Unhandled rejection: {reason}");
    }
}
