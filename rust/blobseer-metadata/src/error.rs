use blobseer_storage::DhtError;
use thiserror::Error;

use crate::{Interval, PageKey};

/// The common error type used by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// There was a problem when accessing the DHT
    #[error("DHT error: {0}")]
    Storage(DhtError),

    /// A tree node that must exist was not found in the DHT
    #[error("Tree node not found: {0}")]
    MissingNode(Interval),

    /// The provider list of a referenced page was not found in the DHT
    #[error("Provider list not found for page {0}")]
    MissingProviders(PageKey),

    /// The tree did not match the expected shape
    #[error("Tree did not match expected shape: {0}")]
    MalformedTree(String),

    /// A range or page set handed to the tree was not valid
    #[error("Invalid range: {0}")]
    InvalidRange(String),
}

impl From<DhtError> for MetadataError {
    fn from(value: DhtError) -> Self {
        MetadataError::Storage(value)
    }
}
