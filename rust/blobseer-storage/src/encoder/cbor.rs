use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use super::Encoder;
use crate::DhtError;

/// A basic [`Encoder`] implementation that encodes records as IPLD-compatible
/// CBOR. The encoding is deterministic, so equal records always produce equal
/// bytes (which is what put-if-absent relies on).
#[derive(Clone, Copy, Debug, Default)]
pub struct CborEncoder;

#[async_trait]
impl Encoder for CborEncoder {
    async fn encode<T>(&self, item: &T) -> Result<Vec<u8>, DhtError>
    where
        T: Serialize + Sync,
    {
        serde_ipld_dagcbor::to_vec(item).map_err(|error| DhtError::EncodeFailed(format!("{error}")))
    }

    async fn decode<T>(&self, bytes: &[u8]) -> Result<T, DhtError>
    where
        T: DeserializeOwned + Send,
    {
        serde_ipld_dagcbor::from_slice::<T>(bytes)
            .map_err(|error| DhtError::DecodeFailed(format!("{error}")))
    }
}
