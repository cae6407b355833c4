use std::time::Duration;

use blobseer_storage::{
    CborEncoder, DEFAULT_SECRET, DEFAULT_TTL, Dht, DhtBackend, Encoder, PutOptions,
};

use crate::{DhtKey, Interval, MetadataError, PageKey, ProviderList, TreeNode};

/// Settings applied to every record the tree writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOptions {
    /// How long records live in the DHT. Zero keeps them forever.
    pub ttl: Duration,
    /// Secret guarding provider lists against foreign replacement
    pub secret: String,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            secret: DEFAULT_SECRET.to_string(),
        }
    }
}

impl From<TreeOptions> for PutOptions {
    fn from(value: TreeOptions) -> Self {
        PutOptions {
            ttl: value.ttl,
            secret: value.secret,
        }
    }
}

/// The versioned segment tree of every blob, as stored in a [`Dht`].
///
/// The tree itself is stateless: all nodes live in the DHT, and any version
/// is reached through its [`crate::VersionRoot`]. Writing a version is done
/// with [`IntervalTree::write_record_locations`], reading one with
/// [`IntervalTree::read_record_locations`].
#[derive(Clone)]
pub struct IntervalTree<Backend, Codec = CborEncoder>
where
    Backend: DhtBackend,
    Codec: Encoder,
{
    pub(crate) dht: Dht<Backend, Codec>,
    pub(crate) options: PutOptions,
}

impl<Backend, Codec> IntervalTree<Backend, Codec>
where
    Backend: DhtBackend,
    Codec: Encoder,
{
    /// Create a new [`IntervalTree`] with default [`TreeOptions`]
    pub fn new(dht: Dht<Backend, Codec>) -> Self {
        Self::with_options(dht, TreeOptions::default())
    }

    /// Create a new [`IntervalTree`] writing records with `options`
    pub fn with_options(dht: Dht<Backend, Codec>, options: TreeOptions) -> Self {
        Self {
            dht,
            options: options.into(),
        }
    }

    /// The DHT holding the tree
    pub fn dht(&self) -> &Dht<Backend, Codec> {
        &self.dht
    }

    /// Fetch the node at `interval`. A node that is referenced must exist,
    /// so a miss is an error.
    pub async fn node(&self, interval: &Interval) -> Result<TreeNode, MetadataError> {
        self.dht
            .read(&DhtKey::Node(*interval))
            .await?
            .ok_or(MetadataError::MissingNode(*interval))
    }

    /// Fetch the provider list of the page `key`
    pub async fn providers(&self, key: &PageKey) -> Result<ProviderList, MetadataError> {
        self.dht
            .read(&DhtKey::Page(*key))
            .await?
            .ok_or(MetadataError::MissingProviders(*key))
    }
}
