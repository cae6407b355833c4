use std::time::Duration;

use futures_util::future::try_join_all;
use serde::{Serialize, de::DeserializeOwned};
use tracing::trace;

use crate::{CborEncoder, DhtBackend, DhtError, Encoder, display_key};

/// Default lifetime of records written by this crate (one day).
pub const DEFAULT_TTL: Duration = Duration::from_secs(86400);

/// Default secret that metadata records are written under.
pub const DEFAULT_SECRET: &str = "blobseer-metadata";

/// The lifetime and secret that accompany every write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutOptions {
    /// How long the record should live; zero means forever
    pub ttl: Duration,
    /// The secret the record is bound with
    pub secret: String,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            secret: DEFAULT_SECRET.to_string(),
        }
    }
}

/// A universal envelope for all compatible combinations of [Encoder] and
/// [DhtBackend] implementations, exposing typed reads and writes.
///
/// Batched operations ([Dht::read_many], [Dht::write_many]) dispatch every
/// request before waiting for any of them, and resolve once all of them have
/// completed or as soon as the first one fails.
#[derive(Clone)]
pub struct Dht<Backend, Codec = CborEncoder>
where
    Backend: DhtBackend,
    Codec: Encoder,
{
    /// The [Encoder] used by the [Dht]
    pub encoder: Codec,
    /// The [DhtBackend] used by the [Dht]
    pub backend: Backend,
}

impl<Backend> Dht<Backend, CborEncoder>
where
    Backend: DhtBackend,
{
    /// Pair the backend with the default [CborEncoder].
    pub fn new(backend: Backend) -> Self {
        Self {
            encoder: CborEncoder,
            backend,
        }
    }
}

impl<Backend, Codec> Dht<Backend, Codec>
where
    Backend: DhtBackend,
    Codec: Encoder,
{
    /// Retrieve the record bound to `key`, if any
    pub async fn read<K, V>(&self, key: &K) -> Result<Option<V>, DhtError>
    where
        K: Serialize + Sync,
        V: DeserializeOwned + Send,
    {
        let key = self.encoder.encode(key).await?;
        let Some(bytes) = self.backend.get(&key).await? else {
            trace!(key = %display_key(&key), "get miss");
            return Ok(None);
        };
        Ok(Some(self.encoder.decode(&bytes).await?))
    }

    /// Bind `value` to `key` unless the key is already bound (see
    /// [DhtBackend::put])
    pub async fn write<K, V>(&self, key: &K, value: &V, options: &PutOptions) -> Result<(), DhtError>
    where
        K: Serialize + Sync,
        V: Serialize + Sync,
    {
        let key = self.encoder.encode(key).await?;
        let value = self.encoder.encode(value).await?;
        self.backend
            .put(key, value, options.ttl, &options.secret)
            .await
    }

    /// Bind `value` to `key`, overwriting a record written with the same
    /// secret (see [DhtBackend::replace])
    pub async fn overwrite<K, V>(
        &self,
        key: &K,
        value: &V,
        options: &PutOptions,
    ) -> Result<(), DhtError>
    where
        K: Serialize + Sync,
        V: Serialize + Sync,
    {
        let key = self.encoder.encode(key).await?;
        let value = self.encoder.encode(value).await?;
        self.backend
            .replace(key, value, options.ttl, &options.secret)
            .await
    }

    /// Fetch many records at once. Results are positional.
    pub async fn read_many<K, V>(&self, keys: &[K]) -> Result<Vec<Option<V>>, DhtError>
    where
        K: Serialize + Sync,
        V: DeserializeOwned + Send,
    {
        try_join_all(keys.iter().map(|key| self.read(key))).await
    }

    /// Write many records at once with put-if-absent semantics.
    pub async fn write_many<K, V>(
        &self,
        records: &[(K, V)],
        options: &PutOptions,
    ) -> Result<(), DhtError>
    where
        K: Serialize + Sync,
        V: Serialize + Sync,
    {
        try_join_all(
            records
                .iter()
                .map(|(key, value)| self.write(key, value, options)),
        )
        .await?;
        Ok(())
    }
}
