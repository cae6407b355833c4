use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::DhtBackend;
use crate::{Blake3Hash, DhtError, blake3_hash, display_key};

#[derive(Clone, Debug)]
struct Record {
    value: Vec<u8>,
    secret: Blake3Hash,
    expires_at: Option<Instant>,
}

impl Record {
    fn new(value: Vec<u8>, ttl: Duration, secret: &str) -> Self {
        Self {
            value,
            secret: blake3_hash(secret.as_bytes()),
            expires_at: expiry(ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// A zero TTL means the record never expires.
fn expiry(ttl: Duration) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        Instant::now().checked_add(ttl)
    }
}

/// A trivial implementation of [DhtBackend] - backed by a [HashMap] - where
/// all records are kept in memory and never persisted. Only the hash of a
/// record's secret is retained.
#[derive(Clone, Default)]
pub struct MemoryDht {
    entries: Arc<RwLock<HashMap<Vec<u8>, Record>>>,
}

impl MemoryDht {
    /// The number of live (unexpired) records
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|record| record.is_live(now)).count()
    }

    /// Whether no live record is stored
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DhtBackend for MemoryDht {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DhtError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|record| record.is_live(now))
            .map(|record| record.value.clone()))
    }

    async fn put(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        ttl: Duration,
        secret: &str,
    ) -> Result<(), DhtError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let identical = entries
            .get(&key)
            .filter(|record| record.is_live(now))
            .map(|record| record.value == value);

        match identical {
            Some(true) => Ok(()),
            Some(false) => Err(DhtError::Conflict(display_key(&key))),
            None => {
                entries.insert(key, Record::new(value, ttl, secret));
                Ok(())
            }
        }
    }

    async fn replace(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        ttl: Duration,
        secret: &str,
    ) -> Result<(), DhtError> {
        let now = Instant::now();
        let presented = blake3_hash(secret.as_bytes());
        let mut entries = self.entries.write().await;
        let mismatch = entries
            .get(&key)
            .filter(|record| record.is_live(now))
            .is_some_and(|record| record.secret != presented);

        if mismatch {
            return Err(DhtError::SecretMismatch(display_key(&key)));
        }
        entries.insert(key, Record::new(value, ttl, secret));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const SECRET: &str = "secret";

    #[tokio::test]
    async fn it_writes_and_reads_a_value() -> Result<()> {
        let dht = MemoryDht::default();

        dht.put(vec![1, 2, 3], vec![4, 5, 6], Duration::ZERO, SECRET)
            .await?;

        assert_eq!(dht.get(&[1, 2, 3]).await?, Some(vec![4, 5, 6]));
        assert_eq!(dht.get(&[3, 2, 1]).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn it_only_binds_a_key_once() -> Result<()> {
        let dht = MemoryDht::default();

        dht.put(vec![1], vec![1], Duration::ZERO, SECRET).await?;
        // Identical value is idempotent
        dht.put(vec![1], vec![1], Duration::ZERO, SECRET).await?;

        let result = dht.put(vec![1], vec![2], Duration::ZERO, SECRET).await;
        assert!(matches!(result, Err(DhtError::Conflict(_))));
        assert_eq!(dht.get(&[1]).await?, Some(vec![1]));
        Ok(())
    }

    #[tokio::test]
    async fn it_replaces_only_with_the_matching_secret() -> Result<()> {
        let dht = MemoryDht::default();

        dht.replace(vec![7], vec![1], Duration::ZERO, SECRET).await?;
        dht.replace(vec![7], vec![2], Duration::ZERO, SECRET).await?;
        assert_eq!(dht.get(&[7]).await?, Some(vec![2]));

        let result = dht.replace(vec![7], vec![3], Duration::ZERO, "other").await;
        assert!(matches!(result, Err(DhtError::SecretMismatch(_))));
        assert_eq!(dht.get(&[7]).await?, Some(vec![2]));
        Ok(())
    }

    #[tokio::test]
    async fn it_forgets_expired_records() -> Result<()> {
        let dht = MemoryDht::default();

        dht.put(vec![9], vec![1], Duration::from_millis(10), SECRET)
            .await?;
        assert_eq!(dht.len().await, 1);

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(dht.get(&[9]).await?, None);
        assert!(dht.is_empty().await);
        // An expired key may be bound again
        dht.put(vec![9], vec![2], Duration::ZERO, SECRET).await?;
        assert_eq!(dht.get(&[9]).await?, Some(vec![2]));
        Ok(())
    }
}
