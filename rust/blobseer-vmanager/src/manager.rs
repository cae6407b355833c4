use std::sync::Arc;

use blobseer_metadata::{Interval, ObjectId, TicketReply, Version, VersionRoot};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{ObjectState, VersionManagerError};

/// Allocates versions and publishes them in ticket order, for every blob.
///
/// All state sits behind one mutex. Every operation is in-memory
/// bookkeeping that never waits on I/O, so the lock is held briefly, and
/// ticket issue and publication are linearizable.
///
/// A ticket that is never published blocks publication of every later
/// ticket of the same object, forever. Writers that fail must not expect
/// their successors to become visible.
#[derive(Clone, Default)]
pub struct VersionManager {
    objects: Arc<Mutex<Vec<ObjectState>>>,
}

impl VersionManager {
    /// Create a new, empty object and return its initial root
    pub fn create(&self, page_size: u64, ft_info: u32) -> Result<VersionRoot, VersionManagerError> {
        if page_size == 0 || ft_info == 0 {
            return Err(VersionManagerError::BadArgument(format!(
                "cannot create an object with page size {page_size} and replication {ft_info}"
            )));
        }

        let mut objects = self.objects.lock();
        let object_id = next_object_id(&objects)?;
        let state = ObjectState::new(object_id, page_size, ft_info);
        let root = state.last_root().clone();
        objects.push(state);

        info!(object_id, page_size, ft_info, "Created object");
        Ok(root)
    }

    /// Reserve the next version of `interval.object_id` for a write of
    /// `interval`. The version in `interval` is ignored. When `append` is
    /// set, the offset is ignored too and the write lands at the current end
    /// of the object.
    pub fn get_ticket(
        &self,
        interval: Interval,
        append: bool,
    ) -> Result<TicketReply, VersionManagerError> {
        let mut objects = self.objects.lock();
        let state = state_mut(&mut objects, interval.object_id)?;
        let previous_size = state.max_size();

        let reply = state.issue_ticket(interval.offset, interval.size, append)?;

        if reply.root_size != previous_size {
            info!(
                object_id = interval.object_id,
                from = previous_size,
                to = reply.root_size,
                "Tree grew"
            );
        }
        debug!(
            object_id = interval.object_id,
            ticket = reply.ticket,
            range = %reply.interval,
            left = reply.left.len(),
            right = reply.right.len(),
            "Issued ticket"
        );

        Ok(reply)
    }

    /// Report the tree of `interval.version` as complete. The version, and
    /// every completed version queued behind it, becomes visible once all
    /// earlier tickets are published.
    pub fn publish(&self, interval: Interval) -> Result<(), VersionManagerError> {
        let mut objects = self.objects.lock();
        let state = state_mut(&mut objects, interval.object_id)?;

        let published = state.complete(&interval)?;

        match published.last() {
            Some(latest) => info!(
                object_id = interval.object_id,
                latest,
                count = published.len(),
                "Published versions"
            ),
            None => debug!(
                object_id = interval.object_id,
                version = interval.version,
                "Version waits for earlier tickets"
            ),
        }

        Ok(())
    }

    /// The published root of `version`, or the latest one when `version` is
    /// 0. A version that is not published yet has no root.
    pub fn get_root(
        &self,
        object_id: ObjectId,
        version: Version,
    ) -> Result<Option<VersionRoot>, VersionManagerError> {
        let objects = self.objects.lock();
        let state = state_ref(&objects, object_id)?;

        Ok(match version {
            0 => Some(state.last_root().clone()),
            version => state.root(version).cloned(),
        })
    }

    /// The number of objects created so far
    pub fn get_object_count(&self) -> u32 {
        self.objects.lock().len() as u32
    }

    /// Create a new object whose version 0 is a published version of an
    /// existing one. Only metadata is touched: the clone's tree is the
    /// source version's tree.
    pub fn clone_object(
        &self,
        object_id: ObjectId,
        version: Version,
    ) -> Result<VersionRoot, VersionManagerError> {
        let mut objects = self.objects.lock();

        let source = {
            let state = state_ref(&objects, object_id)?;
            match version {
                0 => state.last_root().clone(),
                version => state.root(version).cloned().ok_or_else(|| {
                    warn!(object_id, version, "Refused to clone an unpublished version");
                    VersionManagerError::VersionNotFound(object_id, version)
                })?,
            }
        };

        let clone_id = next_object_id(&objects)?;
        let root = VersionRoot {
            object_id: clone_id,
            version: 0,
            ..source
        };
        objects.push(ObjectState::from_root(root.clone()));

        info!(
            object_id = clone_id,
            source = object_id,
            version = source.version,
            "Cloned object"
        );
        Ok(root)
    }
}

fn next_object_id(objects: &[ObjectState]) -> Result<ObjectId, VersionManagerError> {
    ObjectId::try_from(objects.len() + 1)
        .map_err(|_| VersionManagerError::ResourceExhausted("no object ids left".into()))
}

fn state_ref(objects: &[ObjectState], object_id: ObjectId) -> Result<&ObjectState, VersionManagerError> {
    (object_id as usize)
        .checked_sub(1)
        .and_then(|index| objects.get(index))
        .ok_or(VersionManagerError::ObjectNotFound(object_id))
}

fn state_mut(
    objects: &mut [ObjectState],
    object_id: ObjectId,
) -> Result<&mut ObjectState, VersionManagerError> {
    (object_id as usize)
        .checked_sub(1)
        .and_then(|index| objects.get_mut(index))
        .ok_or(VersionManagerError::ObjectNotFound(object_id))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use anyhow::Result;

    #[test]
    fn it_numbers_objects_from_one() -> Result<()> {
        let manager = VersionManager::default();

        assert_eq!(manager.create(8, 1)?.object_id, 1);
        assert_eq!(manager.create(4096, 3)?.object_id, 2);
        assert_eq!(manager.get_object_count(), 2);

        assert!(matches!(
            manager.create(0, 1),
            Err(VersionManagerError::BadArgument(_))
        ));

        Ok(())
    }

    #[test]
    fn it_reports_unknown_objects() {
        let manager = VersionManager::default();

        assert_eq!(
            manager.get_root(3, 0),
            Err(VersionManagerError::ObjectNotFound(3))
        );
        assert_eq!(
            manager
                .get_ticket(Interval::new(0, 0, 0, 8), false)
                .map(|reply| reply.ticket),
            Err(VersionManagerError::ObjectNotFound(0))
        );
        assert_eq!(
            manager.publish(Interval::new(1, 1, 0, 8)),
            Err(VersionManagerError::ObjectNotFound(1))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn it_issues_unique_increasing_tickets_to_concurrent_writers() -> Result<()> {
        let manager = VersionManager::default();
        let object_id = manager.create(8, 1)?.object_id;

        let tasks = (0..8u64).map(|writer| {
            let manager = manager.clone();
            tokio::spawn(async move {
                let mut tickets = Vec::new();
                for round in 0..16u64 {
                    let offset = (writer * 16 + round) * 8;
                    let reply = manager.get_ticket(Interval::new(object_id, 0, offset, 8), false)?;
                    tickets.push(reply.ticket);
                }
                Ok::<_, VersionManagerError>(tickets)
            })
        });

        let mut all = BTreeSet::new();
        for task in futures_util::future::join_all(tasks).await {
            let tickets = task??;
            // Each writer sees its own tickets strictly increase
            assert!(tickets.windows(2).all(|pair| pair[0] < pair[1]));
            all.extend(tickets);
        }

        assert_eq!(all, (1..=128).collect::<BTreeSet<Version>>());

        Ok(())
    }

    #[test]
    fn it_jumps_to_the_latest_completed_prefix() -> Result<()> {
        let manager = VersionManager::default();
        let object_id = manager.create(8, 1)?.object_id;

        let replies = (0..3u64)
            .map(|index| manager.get_ticket(Interval::new(object_id, 0, index * 8, 8), false))
            .collect::<Result<Vec<_>, _>>()?;

        manager.publish(replies[1].interval)?;
        manager.publish(replies[2].interval)?;
        assert_eq!(manager.get_root(object_id, 0)?.map(|root| root.version), Some(0));
        assert_eq!(manager.get_root(object_id, 2)?, None);

        manager.publish(replies[0].interval)?;
        let latest = manager.get_root(object_id, 0)?;
        assert_eq!(latest.as_ref().map(|root| root.version), Some(3));
        assert_eq!(latest.map(|root| root.node.size), Some(32));
        assert_eq!(manager.get_root(object_id, 2)?.map(|root| root.current_size), Some(16));

        Ok(())
    }

    #[test]
    fn it_clones_a_published_version() -> Result<()> {
        let manager = VersionManager::default();
        let object_id = manager.create(8, 2)?.object_id;
        let reply = manager.get_ticket(Interval::new(object_id, 0, 0, 24), false)?;

        assert_eq!(
            manager.clone_object(object_id, 1),
            Err(VersionManagerError::VersionNotFound(object_id, 1))
        );

        manager.publish(reply.interval)?;
        let clone = manager.clone_object(object_id, 1)?;

        assert_eq!(clone.object_id, 2);
        assert_eq!(clone.version, 0);
        assert_eq!(clone.node, Interval::new(object_id, 1, 0, 32));
        assert_eq!(clone.current_size, 24);
        assert_eq!(clone.ft_info, 2);

        // The clone grows from where the source left off
        let next = manager.get_ticket(Interval::new(clone.object_id, 0, 0, 8), true)?;
        assert_eq!(next.interval, Interval::new(2, 1, 24, 8));
        assert_eq!(next.stable_root, clone);
        assert_eq!(next.root_size, 32);

        Ok(())
    }
}
