//! Request cache router
//!
//! Decides, per intercepted request, whether to answer from the store, from
//! the network, or both, and keeps the current store up to date as
//! responses flow through.
//!
//! Navigations go network-first so pages never go stale while online. Other
//! assets use either stale-while-revalidate or cache-first; which one is a
//! configuration choice, never a per-request guess.

pub mod policy;

use std::sync::Arc;

use log::{debug, warn};
use regex::Regex;

use crate::{
    config::{Config, Strategy},
    core::{CacheStorage, ExtendableEvent, Network, WorkerResult},
    fetch::{CacheKey, FetchRequest, FetchResponse, Origin},
    metrics,
};

pub use policy::{BypassReason, FetchOutcome, RequestClass};

pub struct CacheRouter {
    config: Arc<Config>,
    origin: Origin,
    bypass: Vec<Regex>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
}

impl CacheRouter {
    pub fn new(
        config: Arc<Config>,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
    ) -> WorkerResult<Self> {
        let origin = config.origin()?;
        let bypass = config.fetch.compile_bypass()?;
        Ok(Self {
            config,
            origin,
            bypass,
            storage,
            network,
        })
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn classify(&self, request: &FetchRequest) -> RequestClass {
        policy::classify(request, &self.origin, &self.config.fetch, &self.bypass)
    }

    /// Handle one intercepted request. Store writes are registered on
    /// `event` and may still be running when this returns.
    pub async fn handle(
        &self,
        request: &FetchRequest,
        event: &mut ExtendableEvent,
    ) -> WorkerResult<FetchOutcome> {
        let class = self.classify(request);
        let Some(strategy) = policy::strategy_for(class, &self.config.fetch) else {
            debug!("Passing through {} {} ({:?})", request.method, request.url, class);
            metrics::record_fetch(FetchOutcome::Passthrough.kind(), "none");
            return Ok(FetchOutcome::Passthrough);
        };

        let result = match strategy {
            Strategy::NetworkFirst => self.network_first(request, event).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request, event).await,
            Strategy::CacheFirst => self.cache_first(request, event).await,
        };

        match &result {
            Ok(outcome) => {
                debug!(
                    "{} {} -> {} via {}",
                    request.method,
                    request.url,
                    outcome.kind(),
                    strategy.as_str()
                );
                metrics::record_fetch(outcome.kind(), strategy.as_str());
            }
            Err(e) => {
                warn!("{} {} failed via {}: {}", request.method, request.url, strategy.as_str(), e);
                metrics::record_fetch("error", strategy.as_str());
            }
        }
        result
    }

    async fn network_first(
        &self,
        request: &FetchRequest,
        event: &mut ExtendableEvent,
    ) -> WorkerResult<FetchOutcome> {
        let key = request.cache_key();
        match self.network.fetch(request).await {
            Ok(response) => {
                if policy::is_storable(Strategy::NetworkFirst, &response, &self.config.fetch) {
                    self.store_in_background(event, key, response.clone());
                }
                Ok(FetchOutcome::NetworkFresh(response))
            }
            Err(e) => {
                debug!("Network failed for {}, trying store: {}", request.url, e);
                match self.lookup(&key).await {
                    Some(cached) => Ok(FetchOutcome::Cached(cached)),
                    None => {
                        let fallback = self.fallback_lookup(request).await;
                        policy::failure_outcome(Strategy::NetworkFirst, e, fallback)
                    }
                }
            }
        }
    }

    async fn stale_while_revalidate(
        &self,
        request: &FetchRequest,
        event: &mut ExtendableEvent,
    ) -> WorkerResult<FetchOutcome> {
        let key = request.cache_key();
        if let Some(cached) = self.lookup(&key).await {
            self.revalidate_in_background(event, request.clone(), key);
            return Ok(FetchOutcome::Cached(cached));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if policy::is_storable(Strategy::StaleWhileRevalidate, &response, &self.config.fetch)
                {
                    self.store_in_background(event, key, response.clone());
                }
                Ok(FetchOutcome::NetworkFresh(response))
            }
            Err(e) => {
                debug!("Network failed for uncached {}: {}", request.url, e);
                let fallback = self.fallback_lookup(request).await;
                policy::failure_outcome(Strategy::StaleWhileRevalidate, e, fallback)
            }
        }
    }

    async fn cache_first(
        &self,
        request: &FetchRequest,
        event: &mut ExtendableEvent,
    ) -> WorkerResult<FetchOutcome> {
        let key = request.cache_key();
        if let Some(cached) = self.lookup(&key).await {
            return Ok(FetchOutcome::Cached(cached));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if policy::is_storable(Strategy::CacheFirst, &response, &self.config.fetch) {
                    self.store_in_background(event, key, response.clone());
                } else {
                    debug!(
                        "Not caching {} (status {}, type {:?})",
                        request.url, response.status, response.response_type
                    );
                }
                Ok(FetchOutcome::NetworkFresh(response))
            }
            Err(e) => {
                let fallback = self.fallback_lookup(request).await;
                policy::failure_outcome(Strategy::CacheFirst, e, fallback)
            }
        }
    }

    /// Current store first, then the dynamic store. Store failures count as
    /// a miss.
    async fn lookup(&self, key: &CacheKey) -> Option<FetchResponse> {
        let worker = &self.config.worker;
        let names = std::iter::once(worker.cache_name.as_str())
            .chain(worker.dynamic_cache_name.as_deref());

        for name in names {
            match self.storage.has(name).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!("Failed to check store {name}: {e}");
                    continue;
                }
            }
            let found = match self.storage.open(name).await {
                Ok(cache) => cache.match_key(key).await,
                Err(e) => Err(e),
            };
            match found {
                Ok(Some(response)) => return Some(response),
                Ok(None) => {}
                Err(e) => warn!("Failed to read {key} from store {name}: {e}"),
            }
        }
        None
    }

    /// Cross-store lookup by URL, only for the configured destinations.
    async fn fallback_lookup(&self, request: &FetchRequest) -> Option<FetchResponse> {
        if !self
            .config
            .fetch
            .fallback_destinations
            .contains(&request.destination)
        {
            return None;
        }
        match self.storage.match_any(&request.cache_key()).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Fallback lookup for {} failed: {}", request.url, e);
                None
            }
        }
    }

    fn store_in_background(&self, event: &mut ExtendableEvent, key: CacheKey, response: FetchResponse) {
        let storage = self.storage.clone();
        let cache_name = self.config.worker.cache_name.clone();
        event.wait_until(async move {
            let cache = storage.open(&cache_name).await?;
            cache.put(key, response).await
        });
    }

    /// Refresh the stored entry for next time; the result never reaches the
    /// current caller and failures are dropped.
    fn revalidate_in_background(
        &self,
        event: &mut ExtendableEvent,
        request: FetchRequest,
        key: CacheKey,
    ) {
        let storage = self.storage.clone();
        let network = self.network.clone();
        let config = self.config.clone();
        event.wait_until(async move {
            let response = match network.fetch(&request).await {
                Ok(response) => response,
                Err(e) => {
                    debug!("Background refresh of {} failed: {}", request.url, e);
                    metrics::record_revalidation("failed");
                    return Ok(());
                }
            };

            if !policy::is_storable(Strategy::StaleWhileRevalidate, &response, &config.fetch) {
                metrics::record_revalidation("skipped");
                return Ok(());
            }

            let cache = storage.open(&config.worker.cache_name).await?;
            cache.put(key, response).await?;
            metrics::record_revalidation("updated");
            Ok(())
        });
    }
}
