use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::DhtError;

mod memory;
pub use memory::*;

/// A [DhtBackend] is a facade over a distributed key/value substrate. Keys and
/// values are opaque byte buffers; records carry a time-to-live and the
/// secret they were written with.
#[async_trait]
pub trait DhtBackend: Clone + Send + Sync {
    /// Retrieve the value (if any) stored against the given key
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DhtError>;

    /// Store `value` against `key` only if the key is unbound. Storing a value
    /// identical to the one already bound succeeds without effect; any other
    /// value yields [DhtError::Conflict].
    async fn put(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        ttl: Duration,
        secret: &str,
    ) -> Result<(), DhtError>;

    /// Store `value` against `key`, overwriting a record that was written
    /// with the same `secret`.
    async fn replace(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        ttl: Duration,
        secret: &str,
    ) -> Result<(), DhtError>;
}

#[async_trait]
impl<T> DhtBackend for Arc<T>
where
    T: DhtBackend,
{
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DhtError> {
        self.as_ref().get(key).await
    }

    async fn put(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        ttl: Duration,
        secret: &str,
    ) -> Result<(), DhtError> {
        self.as_ref().put(key, value, ttl, secret).await
    }

    async fn replace(
        &self,
        key: Vec<u8>,
        value: Vec<u8>,
        ttl: Duration,
        secret: &str,
    ) -> Result<(), DhtError> {
        self.as_ref().replace(key, value, ttl, secret).await
    }
}
