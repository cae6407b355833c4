use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use sieve_cache::SieveCache;
use tokio::sync::Mutex;

use crate::{DhtBackend, DhtError};

#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: (!ttl.is_zero())
                .then(|| Instant::now().checked_add(ttl))
                .flatten(),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// A [CachedDht] acts as a transparent proxy to an inner [DhtBackend]
/// implementation. Writes are passed through to the inner backend and, once
/// they succeed, remembered. Reads are cached in a [SieveCache] and may be
/// served from there on future reads.
///
/// Records written through [DhtBackend::put] are immutable, so a cached copy
/// can only go stale through expiry or [DhtBackend::replace] performed by
/// another client. A record written through the cache expires from it along
/// with its TTL. The backend does not report how long a record it serves
/// has left to live, so a record filled in by a read is kept for at most
/// `max_age` (see [CachedDht::with_max_age]), or until evicted when no
/// maximum age is set.
#[derive(Clone)]
pub struct CachedDht<Backend>
where
    Backend: DhtBackend,
{
    backend: Backend,
    cache: Arc<Mutex<SieveCache<Vec<u8>, Entry>>>,
    max_age: Duration,
}

impl<Backend> CachedDht<Backend>
where
    Backend: DhtBackend,
{
    /// Wrap the provided [DhtBackend] so that it is fronted by a cache with
    /// capacity equal to `cache_size`
    pub fn new(backend: Backend, cache_size: usize) -> Result<Self, DhtError> {
        Ok(Self {
            backend,
            cache: Arc::new(Mutex::new(SieveCache::new(cache_size).map_err(
                |error| DhtError::Backend(format!("Could not initialize cache: {error}")),
            )?)),
            max_age: Duration::ZERO,
        })
    }

    /// Keep records filled in by reads for at most `max_age`; zero keeps
    /// them until evicted
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// The wrapped [DhtBackend]
    pub fn inner(&self) -> &Backend {
        &self.backend
    }
}

#[async_trait]
impl<Backend> DhtBackend for CachedDht<Backend>
where
    Backend: DhtBackend,
{
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DhtError> {
        let key = key.to_vec();
        {
            let now = Instant::now();
            let mut cache = self.cache.lock().await;
            match cache
                .get(&key)
                .map(|entry| entry.is_live(now).then(|| entry.value.clone()))
            {
                Some(Some(value)) => return Ok(Some(value)),
                Some(None) => {
                    cache.remove(&key);
                }
                None => {}
            }
        }

        let value = self.backend.get(&key).await?;
        if let Some(value) = &value {
            self.cache
                .lock()
                .await
                .insert(key, Entry::new(value.clone(), self.max_age));
        }
        Ok(value)
    }

    async fn put(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        ttl: Duration,
        secret: &str,
    ) -> Result<(), DhtError> {
        self.backend
            .put(key.clone(), value.clone(), ttl, secret)
            .await?;
        self.cache.lock().await.insert(key, Entry::new(value, ttl));
        Ok(())
    }

    async fn replace(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        ttl: Duration,
        secret: &str,
    ) -> Result<(), DhtError> {
        self.backend
            .replace(key.clone(), value.clone(), ttl, secret)
            .await?;
        self.cache.lock().await.insert(key, Entry::new(value, ttl));
        Ok(())
    }
}
