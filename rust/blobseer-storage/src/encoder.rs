use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::DhtError;

mod cbor;
pub use cbor::*;

/// An [Encoder] converts keys and records to and from the opaque byte
/// buffers that a [crate::DhtBackend] stores.
#[async_trait]
pub trait Encoder: Clone + Send + Sync {
    /// Encode a serializable key or record into bytes.
    async fn encode<T>(&self, item: &T) -> Result<Vec<u8>, DhtError>
    where
        T: Serialize + Sync;

    /// Decode bytes into some deserializable type.
    async fn decode<T>(&self, bytes: &[u8]) -> Result<T, DhtError>
    where
        T: DeserializeOwned + Send;
}
