//! In-memory verdict cache — bounded LRU with optional TTL.

use async_trait::async_trait;
use calmwire_core::analysis::AnalysisResult;
use calmwire_core::cache::{CacheKey, ResponseCache};
use calmwire_core::error::CacheError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct CacheEntry {
    result: AnalysisResult,
    inserted_at: Instant,
    last_used: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    clock: u64,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// A process-local cache holding at most `capacity` verdicts.
///
/// Reads refresh recency. When full, the least recently used entry is
/// evicted; expired entries are dropped lazily on access and before
/// eviction.
pub struct InMemoryCache {
    inner: Arc<RwLock<Inner>>,
    capacity: usize,
    ttl: Option<Duration>,
}

impl InMemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            capacity: capacity.max(1),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.duration_since(entry.inserted_at) >= ttl)
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(1000).with_ttl(Some(Duration::from_secs(3600)))
    }
}

#[async_trait]
impl ResponseCache for InMemoryCache {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<AnalysisResult>, CacheError> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;

        let expired = match inner.entries.get(key) {
            None => return Ok(None),
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            inner.entries.remove(key);
            return Ok(None);
        }

        let tick = inner.tick();
        Ok(inner.entries.get_mut(key).map(|entry| {
            entry.last_used = tick;
            entry.result.clone()
        }))
    }

    async fn set(&self, key: CacheKey, result: AnalysisResult) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            inner.entries.retain(|_, e| !self.is_expired(e, now));

            if inner.entries.len() >= self.capacity {
                let oldest = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    inner.entries.remove(&oldest);
                }
            }
        }

        let tick = inner.tick();
        inner.entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: now,
                last_used: tick,
            },
        );
        Ok(())
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Ok(self.inner.read().await.entries.len())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.inner.write().await.entries.clear();
        Ok(())
    }
}
