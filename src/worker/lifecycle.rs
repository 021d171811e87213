//! Store population and cleanup around install and activation.

use std::sync::Arc;

use futures::future::try_join_all;
use log::{debug, info, warn};

use crate::{
    config::{self, Config},
    core::{CacheStorage, ErrorContext, Network, WorkerError, WorkerResult},
    fetch::FetchRequest,
};

/// Fetch every URL and write all of them to the current store in one batch.
///
/// Nothing is written unless every fetch succeeded with a cacheable status.
/// Paths are resolved against the configured origin and must stay within it.
pub async fn precache(
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    config: Arc<Config>,
    urls: Vec<String>,
) -> WorkerResult<usize> {
    let origin = config.origin()?;
    let requests = urls
        .iter()
        .map(|path| {
            let url = origin.resolve(path)?;
            let request = FetchRequest::get(&url.to_string())?;
            if !request.is_same_origin(&origin) {
                return Err(WorkerError::InvalidRequest(format!(
                    "refusing to precache cross-origin URL {url}"
                )));
            }
            Ok(request)
        })
        .collect::<WorkerResult<Vec<_>>>()?;

    let network = &network;
    let policy = &config.fetch;
    let entries = try_join_all(requests.iter().map(|request| async move {
        let response = network.fetch(request).await?;
        if !policy.is_cacheable_status(response.status) {
            return Err(WorkerError::Http {
                url: request.url.to_string(),
                status: response.status,
            });
        }
        debug!("Fetched {} for precache", request.url);
        Ok((request.cache_key(), response))
    }))
    .await?;

    let count = entries.len();
    let cache_name = &config.worker.cache_name;
    let cache = storage.open(cache_name).await?;
    cache
        .put_all(entries)
        .await
        .with_context(&format!("Failed to write {count} entries to {cache_name}"))?;
    Ok(count)
}

/// Delete every store other than the current and dynamic ones. Returns how
/// many were removed; individual failures are logged and skipped.
pub async fn purge_stale_stores(storage: &dyn CacheStorage, worker: &config::Worker) -> usize {
    let names = match storage.keys().await {
        Ok(names) => names,
        Err(e) => {
            warn!("Failed to list stores for cleanup: {e}");
            return 0;
        }
    };

    let mut purged = 0;
    for name in names {
        let keep = name == worker.cache_name
            || worker.dynamic_cache_name.as_deref() == Some(name.as_str());
        if keep {
            continue;
        }
        match storage.delete(&name).await {
            Ok(true) => {
                info!("Deleted stale store {name}");
                purged += 1;
            }
            Ok(false) => {}
            Err(e) => warn!("Failed to delete stale store {name}: {e}"),
        }
    }
    purged
}
