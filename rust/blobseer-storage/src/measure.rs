use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{DhtBackend, DhtError};

/// A [MeasuredDht] acts as a proxy over a [DhtBackend] implementation that
/// measures reads and writes.
#[derive(Clone)]
pub struct MeasuredDht<Backend>
where
    Backend: DhtBackend,
{
    gets: Arc<AtomicUsize>,
    puts: Arc<AtomicUsize>,
    backend: Backend,
}

impl<Backend> MeasuredDht<Backend>
where
    Backend: DhtBackend,
{
    /// Wrap the provided [DhtBackend] so that reads and writes to it may be
    /// measured.
    pub fn new(backend: Backend) -> Self {
        Self {
            gets: Arc::new(AtomicUsize::default()),
            puts: Arc::new(AtomicUsize::default()),
            backend,
        }
    }

    /// The aggregate number of gets issued to the wrapped [DhtBackend]
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::Relaxed)
    }

    /// The aggregate number of puts and replaces issued to the wrapped
    /// [DhtBackend]
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::Relaxed)
    }

    /// Zero both counters
    pub fn reset(&self) {
        self.gets.store(0, Ordering::Relaxed);
        self.puts.store(0, Ordering::Relaxed);
    }
}

#[async_trait]
impl<Backend> DhtBackend for MeasuredDht<Backend>
where
    Backend: DhtBackend,
{
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DhtError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.backend.get(key).await
    }

    async fn put(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        ttl: Duration,
        secret: &str,
    ) -> Result<(), DhtError> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.backend.put(key, value, ttl, secret).await
    }

    async fn replace(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        ttl: Duration,
        secret: &str,
    ) -> Result<(), DhtError> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.backend.replace(key, value, ttl, secret).await
    }
}
