use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use blobseer_metadata::{PageKey, ProviderDesc};
use tokio::sync::RwLock;

use crate::ClientError;

/// The storage providers that hold page bytes.
///
/// Providers are outside the metadata engine; this is the narrow contract the
/// client needs from them.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    /// Store a replica of the page `key` on `provider`
    async fn put_page(
        &self,
        provider: &ProviderDesc,
        key: &PageKey,
        bytes: Vec<u8>,
    ) -> Result<(), ClientError>;

    /// Fetch the replica of the page `key` held by `provider`
    async fn get_page(
        &self,
        provider: &ProviderDesc,
        key: &PageKey,
    ) -> Result<Option<Vec<u8>>, ClientError>;
}

#[derive(Default)]
struct Pages {
    replicas: HashMap<(ProviderDesc, PageKey), Vec<u8>>,
    offline: BTreeSet<ProviderDesc>,
}

/// In-process providers, all sharing one map. Individual providers can be
/// taken offline, and replicas tampered with, to exercise failure handling.
#[derive(Clone, Default)]
pub struct MemoryProviders {
    pages: Arc<RwLock<Pages>>,
}

impl MemoryProviders {
    /// Make every request to `provider` fail until it is brought back
    pub async fn take_offline(&self, provider: &ProviderDesc) {
        self.pages.write().await.offline.insert(provider.clone());
    }

    /// Undo [`MemoryProviders::take_offline`]
    pub async fn bring_online(&self, provider: &ProviderDesc) {
        self.pages.write().await.offline.remove(provider);
    }

    /// Replace the bytes of one replica, if it exists
    pub async fn tamper(&self, provider: &ProviderDesc, key: &PageKey, bytes: Vec<u8>) {
        if let Some(replica) = self
            .pages
            .write()
            .await
            .replicas
            .get_mut(&(provider.clone(), *key))
        {
            *replica = bytes;
        }
    }

    /// The number of replicas stored across all providers
    pub async fn replica_count(&self) -> usize {
        self.pages.read().await.replicas.len()
    }
}

#[async_trait]
impl ProviderStore for MemoryProviders {
    async fn put_page(
        &self,
        provider: &ProviderDesc,
        key: &PageKey,
        bytes: Vec<u8>,
    ) -> Result<(), ClientError> {
        let mut pages = self.pages.write().await;
        if pages.offline.contains(provider) {
            return Err(ClientError::Provider(format!("{provider} is offline")));
        }
        pages.replicas.insert((provider.clone(), *key), bytes);
        Ok(())
    }

    async fn get_page(
        &self,
        provider: &ProviderDesc,
        key: &PageKey,
    ) -> Result<Option<Vec<u8>>, ClientError> {
        let pages = self.pages.read().await;
        if pages.offline.contains(provider) {
            return Err(ClientError::Provider(format!("{provider} is offline")));
        }
        Ok(pages.replicas.get(&(provider.clone(), *key)).cloned())
    }
}

#[async_trait]
impl<T> ProviderStore for Arc<T>
where
    T: ProviderStore + ?Sized,
{
    async fn put_page(
        &self,
        provider: &ProviderDesc,
        key: &PageKey,
        bytes: Vec<u8>,
    ) -> Result<(), ClientError> {
        (**self).put_page(provider, key, bytes).await
    }

    async fn get_page(
        &self,
        provider: &ProviderDesc,
        key: &PageKey,
    ) -> Result<Option<Vec<u8>>, ClientError> {
        (**self).get_page(provider, key).await
    }
}
