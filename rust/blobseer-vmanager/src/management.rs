use std::sync::Arc;

use async_trait::async_trait;
use blobseer_metadata::{Interval, ObjectId, TicketReply, Version, VersionRoot};

use crate::{VersionManager, VersionManagerError};

/// The operations a writer or reader needs from a version manager.
///
/// Clients hold a [`VersionManagement`] rather than a [`VersionManager`], so
/// that the manager may live in-process or behind a transport.
#[async_trait]
pub trait VersionManagement: Send + Sync {
    /// Create a new object, see [`VersionManager::create`]
    async fn create(&self, page_size: u64, ft_info: u32) -> Result<VersionRoot, VersionManagerError>;

    /// Reserve a version for a write, see [`VersionManager::get_ticket`]
    async fn get_ticket(
        &self,
        interval: Interval,
        append: bool,
    ) -> Result<TicketReply, VersionManagerError>;

    /// Report a version's tree as complete, see [`VersionManager::publish`]
    async fn publish(&self, interval: Interval) -> Result<(), VersionManagerError>;

    /// Look up a published root, see [`VersionManager::get_root`]
    async fn get_root(
        &self,
        object_id: ObjectId,
        version: Version,
    ) -> Result<Option<VersionRoot>, VersionManagerError>;

    /// The number of objects, see [`VersionManager::get_object_count`]
    async fn get_object_count(&self) -> Result<u32, VersionManagerError>;

    /// Clone a published version, see [`VersionManager::clone_object`]
    async fn clone_object(
        &self,
        object_id: ObjectId,
        version: Version,
    ) -> Result<VersionRoot, VersionManagerError>;
}

#[async_trait]
impl VersionManagement for VersionManager {
    async fn create(&self, page_size: u64, ft_info: u32) -> Result<VersionRoot, VersionManagerError> {
        VersionManager::create(self, page_size, ft_info)
    }

    async fn get_ticket(
        &self,
        interval: Interval,
        append: bool,
    ) -> Result<TicketReply, VersionManagerError> {
        VersionManager::get_ticket(self, interval, append)
    }

    async fn publish(&self, interval: Interval) -> Result<(), VersionManagerError> {
        VersionManager::publish(self, interval)
    }

    async fn get_root(
        &self,
        object_id: ObjectId,
        version: Version,
    ) -> Result<Option<VersionRoot>, VersionManagerError> {
        VersionManager::get_root(self, object_id, version)
    }

    async fn get_object_count(&self) -> Result<u32, VersionManagerError> {
        Ok(VersionManager::get_object_count(self))
    }

    async fn clone_object(
        &self,
        object_id: ObjectId,
        version: Version,
    ) -> Result<VersionRoot, VersionManagerError> {
        VersionManager::clone_object(self, object_id, version)
    }
}

#[async_trait]
impl<T> VersionManagement for Arc<T>
where
    T: VersionManagement + ?Sized,
{
    async fn create(&self, page_size: u64, ft_info: u32) -> Result<VersionRoot, VersionManagerError> {
        (**self).create(page_size, ft_info).await
    }

    async fn get_ticket(
        &self,
        interval: Interval,
        append: bool,
    ) -> Result<TicketReply, VersionManagerError> {
        (**self).get_ticket(interval, append).await
    }

    async fn publish(&self, interval: Interval) -> Result<(), VersionManagerError> {
        (**self).publish(interval).await
    }

    async fn get_root(
        &self,
        object_id: ObjectId,
        version: Version,
    ) -> Result<Option<VersionRoot>, VersionManagerError> {
        (**self).get_root(object_id, version).await
    }

    async fn get_object_count(&self) -> Result<u32, VersionManagerError> {
        (**self).get_object_count().await
    }

    async fn clone_object(
        &self,
        object_id: ObjectId,
        version: Version,
    ) -> Result<VersionRoot, VersionManagerError> {
        (**self).clone_object(object_id, version).await
    }
}
