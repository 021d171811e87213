//! Background and periodic sync
//!
//! Both are opportunistic hooks the host fires when connectivity returns or
//! on its own schedule. They currently only make sure their store is open;
//! replaying offline writes is left to the application.

use std::sync::Arc;

use log::{debug, error, info};

use crate::{
    config::Config,
    core::{CacheStorage, WorkerResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed,
    /// The tag is not one this worker registered
    Ignored,
    /// Failed and logged; the host may fire the tag again later
    Failed,
}

pub struct SyncRunner {
    config: Arc<Config>,
    storage: Arc<dyn CacheStorage>,
}

impl SyncRunner {
    pub fn new(config: Arc<Config>, storage: Arc<dyn CacheStorage>) -> Self {
        Self { config, storage }
    }

    pub async fn background_sync(&self, tag: &str) -> SyncOutcome {
        if tag != self.config.sync.background_sync_tag {
            debug!("Ignoring sync tag '{tag}'");
            return SyncOutcome::Ignored;
        }

        let worker = &self.config.worker;
        let store = worker
            .dynamic_cache_name
            .as_deref()
            .unwrap_or(worker.cache_name.as_str());
        Self::finish("Background sync", self.open_store(store).await)
    }

    pub async fn periodic_sync(&self, tag: &str) -> SyncOutcome {
        if tag != self.config.sync.periodic_sync_tag {
            debug!("Ignoring periodic sync tag '{tag}'");
            return SyncOutcome::Ignored;
        }

        Self::finish(
            "Periodic sync",
            self.open_store(&self.config.worker.cache_name).await,
        )
    }

    async fn open_store(&self, name: &str) -> WorkerResult<()> {
        let cache = self.storage.open(name).await?;
        debug!("Sync opened store {}", cache.name());
        Ok(())
    }

    fn finish(what: &str, result: WorkerResult<()>) -> SyncOutcome {
        match result {
            Ok(()) => {
                info!("{what} completed");
                SyncOutcome::Completed
            }
            Err(e) => {
                error!("{what} failed: {e}");
                SyncOutcome::Failed
            }
        }
    }
}
