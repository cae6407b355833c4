use blobseer_metadata::{
    Interval, IntervalTree, MetadataError, ObjectId, PageKey, PageRecord, ReplicaSelection,
    Version, VersionRoot,
};
use blobseer_storage::{CachedDht, Dht, DhtBackend};
use blobseer_vmanager::VersionManagement;
use futures_util::future::try_join_all;
use tracing::{debug, info, warn};

use crate::{ClientError, Config, Placement, ProviderStore};

/// Reads and writes one blob at a time.
///
/// A handler works on the object it created or opened last, at the version
/// it was opened at. Writes always go to the head of the object and do not
/// move the handler's version; call [`ObjectHandler::open`] again to see
/// them.
///
/// A write takes a ticket, stores its pages on providers, builds its tree
/// and publishes. If any step fails the ticket is never published, and no
/// later version of the object can be published either.
pub struct ObjectHandler<Manager, Backend, Providers, Place>
where
    Manager: VersionManagement,
    Backend: DhtBackend,
    Providers: ProviderStore,
    Place: Placement,
{
    manager: Manager,
    tree: IntervalTree<CachedDht<Backend>>,
    providers: Providers,
    placement: Place,
    config: Config,
    root: Option<VersionRoot>,
}

impl<Manager, Backend, Providers, Place> ObjectHandler<Manager, Backend, Providers, Place>
where
    Manager: VersionManagement,
    Backend: DhtBackend,
    Providers: ProviderStore,
    Place: Placement,
{
    /// Create a new [`ObjectHandler`]. Tree reads go through a cache in
    /// front of `backend`.
    pub fn new(
        manager: Manager,
        backend: Backend,
        providers: Providers,
        placement: Place,
        config: Config,
    ) -> Result<Self, ClientError> {
        let options = config.tree_options();
        let cache = CachedDht::new(backend, config.dht.cache_size)
            .map_err(MetadataError::from)?
            .with_max_age(options.ttl);
        Ok(Self {
            manager,
            tree: IntervalTree::with_options(Dht::new(cache), options),
            providers,
            placement,
            config,
            root: None,
        })
    }

    /// The root the handler currently reads from
    pub fn root(&self) -> Option<&VersionRoot> {
        self.root.as_ref()
    }

    /// The tree holding every object's metadata
    pub fn tree(&self) -> &IntervalTree<CachedDht<Backend>> {
        &self.tree
    }

    /// Create a new, empty object with pages of `page_size` bytes, each
    /// stored on `replication` providers, and open it.
    pub async fn create(&mut self, page_size: u64, replication: u32) -> Result<ObjectId, ClientError> {
        let root = self.manager.create(page_size, replication).await?;
        let object_id = root.object_id;
        self.root = Some(root);
        Ok(object_id)
    }

    /// Open the latest published version of `object_id`
    pub async fn open(&mut self, object_id: ObjectId) -> Result<(), ClientError> {
        let root = self
            .manager
            .get_root(object_id, 0)
            .await?
            .ok_or(ClientError::NotOpen)?;
        self.root = Some(root);
        Ok(())
    }

    /// Switch the open object to a published `version`; 0 is the latest
    pub async fn set_version(&mut self, version: Version) -> Result<(), ClientError> {
        let object_id = self.opened()?.object_id;
        let root = self
            .manager
            .get_root(object_id, version)
            .await?
            .ok_or_else(|| {
                ClientError::InvalidRange(format!(
                    "version {version} of object {object_id} is not published"
                ))
            })?;
        self.root = Some(root);
        Ok(())
    }

    /// The number of objects known to the version manager
    pub async fn object_count(&self) -> Result<u32, ClientError> {
        Ok(self.manager.get_object_count().await?)
    }

    /// Read `size` bytes at `offset` of the open version. Pages no version
    /// wrote read as zeroes.
    pub async fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>, ClientError> {
        let root = self.opened()?;
        let page_size = root.page_size;

        if size == 0 || offset % page_size != 0 || size % page_size != 0 {
            return Err(ClientError::InvalidRange(format!(
                "[{offset}, +{size}) is not aligned to pages of {page_size} bytes"
            )));
        }
        if offset.saturating_add(size) > root.current_size {
            return Err(ClientError::InvalidRange(format!(
                "[{offset}, +{size}) reaches past the end of version {} ({} bytes)",
                root.version, root.current_size
            )));
        }

        let slots = self.tree.read_record_locations(root, offset, size).await?;
        let pages = try_join_all(
            slots
                .into_iter()
                .map(|slot| self.fetch_page(slot, page_size as usize)),
        )
        .await?;

        debug!(
            object_id = root.object_id,
            version = root.version,
            offset,
            size,
            "Read range"
        );
        Ok(pages.concat())
    }

    /// Write `data` at `offset` of the open object, creating a new version.
    /// `offset` and the length of `data` must be page aligned.
    pub async fn write(&self, offset: u64, data: &[u8]) -> Result<Version, ClientError> {
        self.write_version(offset, data, false).await
    }

    /// Write `data` at the end of the open object, creating a new version.
    pub async fn append(&self, data: &[u8]) -> Result<Version, ClientError> {
        self.write_version(0, data, true).await
    }

    /// Create a new object sharing all data of a published `version` of the
    /// open object (0 for the latest), and return its id.
    pub async fn clone_object(&self, version: Version) -> Result<ObjectId, ClientError> {
        let object_id = self.opened()?.object_id;
        let root = self.manager.clone_object(object_id, version).await?;
        info!(
            object_id = root.object_id,
            source = object_id,
            "Cloned object"
        );
        Ok(root.object_id)
    }

    async fn write_version(&self, offset: u64, data: &[u8], append: bool) -> Result<Version, ClientError> {
        let root = self.opened()?;
        let page_size = root.page_size as usize;

        if data.is_empty() || data.len() % page_size != 0 {
            return Err(ClientError::InvalidRange(format!(
                "{} bytes do not fill pages of {page_size} bytes",
                data.len()
            )));
        }

        let reply = self
            .manager
            .get_ticket(
                Interval::new(root.object_id, 0, offset, data.len() as u64),
                append,
            )
            .await?;

        let chunks: Vec<&[u8]> = data.chunks(page_size).collect();
        let providers = self
            .placement
            .allocate(chunks.len(), root.ft_info)
            .await?;

        let records: Vec<PageRecord> = reply
            .interval
            .pages(root.page_size)
            .zip(&chunks)
            .zip(providers)
            .map(|((page, bytes), providers)| {
                let key = if self.config.deduplicate {
                    PageKey::for_content(bytes)
                } else {
                    PageKey::for_chunk(&page)
                };
                PageRecord::new(page, key, providers)
            })
            .collect();

        try_join_all(records.iter().zip(&chunks).flat_map(|(record, bytes)| {
            record.providers.iter().map(move |provider| {
                self.providers
                    .put_page(provider, &record.key, bytes.to_vec())
            })
        }))
        .await?;

        self.tree.write_record_locations(&reply, records).await?;
        self.manager.publish(reply.interval).await?;

        info!(
            object_id = root.object_id,
            version = reply.ticket,
            range = %reply.interval,
            "Wrote version"
        );
        Ok(reply.ticket)
    }

    async fn fetch_page(
        &self,
        slot: Option<ReplicaSelection>,
        page_size: usize,
    ) -> Result<Vec<u8>, ClientError> {
        let Some(mut selection) = slot else {
            return Ok(vec![0; page_size]);
        };

        for _ in 0..self.config.read_retries.max(1) {
            let Some(provider) = selection.try_next() else {
                break;
            };

            match self.providers.get_page(&provider, selection.key()).await {
                Ok(Some(bytes)) if bytes.len() == page_size && selection.key().verify(&bytes) => {
                    return Ok(bytes);
                }
                Ok(Some(_)) => warn!("{provider} served a corrupt replica of {}", selection.key()),
                Ok(None) => warn!("{provider} has no replica of {}", selection.key()),
                Err(error) => warn!("{provider} failed to serve {}: {error}", selection.key()),
            }
        }

        Err(ClientError::PageUnavailable(*selection.key()))
    }

    fn opened(&self) -> Result<&VersionRoot, ClientError> {
        self.root.as_ref().ok_or(ClientError::NotOpen)
    }
}
