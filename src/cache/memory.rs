//! In-process cache store
//!
//! Stores live in a `DashMap` keyed by name. Each store keeps its entries
//! behind an `ArcSwap` snapshot, so batch writes become visible atomically.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;

use crate::{
    core::{Cache, CacheStorage, WorkerResult},
    fetch::{CacheKey, FetchResponse},
};

type Entries = HashMap<CacheKey, FetchResponse>;

pub struct MemoryCache {
    name: String,
    seq: u64,
    entries: ArcSwap<Entries>,
}

impl MemoryCache {
    fn new(name: &str, seq: u64) -> Self {
        Self {
            name: name.to_string(),
            seq,
            entries: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<FetchResponse> {
        self.entries.load().get(key).cloned()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_key(&self, key: &CacheKey) -> WorkerResult<Option<FetchResponse>> {
        Ok(self.lookup(key))
    }

    async fn put(&self, key: CacheKey, response: FetchResponse) -> WorkerResult<()> {
        debug!("Cache {} put {}", self.name, key);
        self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            next.insert(key.clone(), response.clone());
            next
        });
        Ok(())
    }

    async fn put_all(&self, entries: Vec<(CacheKey, FetchResponse)>) -> WorkerResult<()> {
        debug!("Cache {} put {} entries", self.name, entries.len());
        self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            next.extend(entries.iter().cloned());
            next
        });
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> WorkerResult<bool> {
        let prev = self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            next.remove(key);
            next
        });
        Ok(prev.contains_key(key))
    }

    async fn keys(&self) -> WorkerResult<Vec<CacheKey>> {
        let mut keys: Vec<CacheKey> = self.entries.load().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// All stores of one origin, held in memory.
#[derive(Default)]
pub struct MemoryCacheStorage {
    caches: DashMap<String, Arc<MemoryCache>>,
    next_seq: AtomicU64,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn ordered(&self) -> Vec<Arc<MemoryCache>> {
        let mut caches: Vec<Arc<MemoryCache>> =
            self.caches.iter().map(|entry| entry.value().clone()).collect();
        caches.sort_by_key(|cache| cache.seq);
        caches
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> WorkerResult<Arc<dyn Cache>> {
        let cache = self
            .caches
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating cache store {name}");
                Arc::new(MemoryCache::new(
                    name,
                    self.next_seq.fetch_add(1, Ordering::SeqCst),
                ))
            })
            .value()
            .clone();
        Ok(cache)
    }

    async fn has(&self, name: &str) -> WorkerResult<bool> {
        Ok(self.caches.contains_key(name))
    }

    async fn delete(&self, name: &str) -> WorkerResult<bool> {
        Ok(self.caches.remove(name).is_some())
    }

    async fn keys(&self) -> WorkerResult<Vec<String>> {
        Ok(self
            .ordered()
            .into_iter()
            .map(|cache| cache.name.clone())
            .collect())
    }

    async fn match_any(&self, key: &CacheKey) -> WorkerResult<Option<FetchResponse>> {
        Ok(self.ordered().iter().find_map(|cache| cache.lookup(key)))
    }
}
