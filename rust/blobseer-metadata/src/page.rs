use std::fmt::Display;

use base58::ToBase58;
use blobseer_storage::{Blake3Hash, blake3_hash};
use serde::{Deserialize, Serialize};

use crate::{Interval, ObjectId, Version};

/// Stable identifier of a page's content.
///
/// With deduplication enabled a page is keyed by the BLAKE3 hash of its
/// bytes, so identical pages written by different versions share both
/// storage and provider list. Otherwise the key is derived from the page's
/// position in the version that wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageKey {
    /// A content-addressed page
    Content(Blake3Hash),
    /// A page addressed by where it was first written
    Chunk {
        /// Object that wrote the page
        object_id: ObjectId,
        /// Version that wrote the page
        version: Version,
        /// Offset of the page within the object
        offset: u64,
    },
}

impl PageKey {
    /// The content-addressed key of `bytes`
    pub fn for_content(bytes: &[u8]) -> Self {
        PageKey::Content(blake3_hash(bytes))
    }

    /// The positional key of the page at `interval`
    pub fn for_chunk(interval: &Interval) -> Self {
        PageKey::Chunk {
            object_id: interval.object_id,
            version: interval.version,
            offset: interval.offset,
        }
    }

    /// Check fetched bytes against the key. Positional keys carry no digest
    /// and accept any content.
    pub fn verify(&self, bytes: &[u8]) -> bool {
        match self {
            PageKey::Content(hash) => blake3_hash(bytes) == *hash,
            PageKey::Chunk { .. } => true,
        }
    }
}

impl Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageKey::Content(hash) => write!(f, "#{}", hash[..].to_base58()),
            PageKey::Chunk {
                object_id,
                version,
                offset,
            } => write!(f, "{object_id}:{version}@{offset}"),
        }
    }
}

/// A storage provider that holds page replicas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderDesc {
    /// Host name or address
    pub host: String,
    /// Service name or port
    pub service: String,
}

impl ProviderDesc {
    /// Create a new [`ProviderDesc`]
    pub fn new(host: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            service: service.into(),
        }
    }
}

impl Display for ProviderDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.service)
    }
}

/// The providers holding replicas of one page.
pub type ProviderList = Vec<ProviderDesc>;

/// A page written by the current version: where it sits in the tree, the key
/// of its content and the providers that now hold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// Leaf interval of the page
    pub interval: Interval,
    /// Key of the page content
    pub key: PageKey,
    /// Providers holding the page
    pub providers: ProviderList,
}

impl PageRecord {
    /// Create a new [`PageRecord`]
    pub fn new(interval: Interval, key: PageKey, providers: ProviderList) -> Self {
        Self {
            interval,
            key,
            providers,
        }
    }
}
