use std::collections::VecDeque;

use blobseer_storage::{DhtBackend, Encoder};
use futures_util::future::{try_join, try_join_all};
use tracing::{debug, trace};

use crate::{
    DhtKey, Interval, IntervalTree, MetadataError, PageRecord, Position, TicketReply, TreeNode,
    VersionRoot, find_sibling, is_power_of_two,
};

/// The boundary of a write whose outside siblings are being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Left,
    Right,
}

impl<Backend, Codec> IntervalTree<Backend, Codec>
where
    Backend: DhtBackend,
    Codec: Encoder,
{
    /// Persist the tree of a new version.
    ///
    /// `pages` are the page-sized, contiguous leaves covering the ticket's
    /// range, in ascending order. Their leaves and provider lists are
    /// written first, then one internal node per level and per written
    /// range up to the root. Subtrees outside the written range are linked
    /// in from the siblings the version manager handed out, or from the
    /// stable tree when no in-flight version wrote there.
    ///
    /// Returns the root interval of the new version. The version becomes
    /// readable only after it is published.
    pub async fn write_record_locations(
        &self,
        reply: &TicketReply,
        pages: Vec<PageRecord>,
    ) -> Result<Interval, MetadataError> {
        validate_pages(reply, &pages)?;

        let (Some(first), Some(last)) = (pages.first(), pages.last()) else {
            return Err(MetadataError::InvalidRange("no pages to write".into()));
        };

        let leaves: Vec<(DhtKey, TreeNode)> = pages
            .iter()
            .map(|page| (DhtKey::Node(page.interval), TreeNode::Leaf { page: page.key }))
            .collect();
        let page_keys: Vec<DhtKey> = pages.iter().map(|page| DhtKey::Page(page.key)).collect();

        let store_pages = async {
            try_join(
                self.dht.write_many(&leaves, &self.options),
                try_join_all(pages.iter().zip(&page_keys).map(|(page, key)| {
                    self.dht.overwrite(key, &page.providers, &self.options)
                })),
            )
            .await?;
            Ok::<_, MetadataError>(())
        };
        let inherit = try_join(
            self.stable_siblings(&reply.stable_root, first.interval, reply.root_size, Edge::Left),
            self.stable_siblings(&reply.stable_root, last.interval, reply.root_size, Edge::Right),
        );

        let (_, (inherited_left, inherited_right)) = try_join(store_pages, inherit).await?;

        let left_siblings = merge_siblings(&reply.left, inherited_left);
        let right_siblings = merge_siblings(&reply.right, inherited_right);

        trace!(
            "Linking version {} to {} left and {} right siblings",
            reply.ticket,
            left_siblings.len(),
            right_siblings.len()
        );

        let mut internal: Vec<(DhtKey, TreeNode)> = Vec::new();
        let mut queue: VecDeque<Interval> = pages.iter().map(|page| page.interval).collect();

        while let Some(node) = queue.pop_front() {
            if node.size >= reply.root_size {
                break;
            }

            let (parent, position) = node.parent();
            let sibling = node.sibling();
            let (left, right) = match position {
                Position::Left => {
                    if queue.front() == Some(&sibling) {
                        queue.pop_front();
                        (Some(node), Some(sibling))
                    } else {
                        (Some(node), find_sibling(&right_siblings, &sibling))
                    }
                }
                Position::Right => (find_sibling(&left_siblings, &sibling), Some(node)),
            };

            internal.push((DhtKey::Node(parent), TreeNode::Internal { left, right }));
            queue.push_back(parent);
        }

        self.dht.write_many(&internal, &self.options).await?;

        let root = Interval::new(reply.interval.object_id, reply.ticket, 0, reply.root_size);

        debug!(
            "Wrote version {} of object {}: {} leaves, {} internal nodes",
            reply.ticket,
            reply.interval.object_id,
            pages.len(),
            internal.len()
        );

        Ok(root)
    }

    /// Collect the siblings of `edge`'s path to the root that the stable
    /// tree provides, on the outer side of `side`.
    ///
    /// The stable tree is walked top-down alongside the path. Its root spans
    /// `[0, stable size)`, which may be smaller than the new root; such a
    /// node fills the lower part of a larger slot and leaves the upper half
    /// a hole. Nodes are only fetched while they span the whole slot on the
    /// path, so a write far from the stable content costs no reads.
    ///
    /// Returns `(slot, node)` pairs: the tree slot being filled and the
    /// stable node that fills it.
    async fn stable_siblings(
        &self,
        stable: &VersionRoot,
        edge: Interval,
        root_size: u64,
        side: Edge,
    ) -> Result<Vec<(Interval, Interval)>, MetadataError> {
        let mut path = Vec::new();
        let mut current = edge;
        while current.size < root_size {
            path.push(current);
            current = current.parent().0;
        }

        let mut cursor = (!stable.is_empty()).then_some(stable.node);
        let mut found = Vec::new();

        for child in path.into_iter().rev() {
            let Some(reference) = cursor else {
                break;
            };

            let (slot, position) = child.parent();
            let (lower, upper) = if reference.size == slot.size {
                match self.node(&reference).await? {
                    TreeNode::Internal { left, right } => (left, right),
                    TreeNode::Leaf { .. } => {
                        return Err(MetadataError::MalformedTree(format!(
                            "leaf {reference} stands for range {slot}"
                        )));
                    }
                }
            } else if reference.size < slot.size {
                (Some(reference), None)
            } else {
                return Err(MetadataError::MalformedTree(format!(
                    "node {reference} does not fit in range {slot}"
                )));
            };

            let (on_path, beside) = match position {
                Position::Left => (lower, upper),
                Position::Right => (upper, lower),
            };

            let outer = match side {
                Edge::Left => position == Position::Right,
                Edge::Right => position == Position::Left,
            };
            if outer {
                if let Some(node) = beside {
                    found.push((child.sibling(), node));
                }
            }

            cursor = on_path;
        }

        Ok(found)
    }
}

/// Siblings handed out by the version manager belong to versions newer than
/// the stable one, and take precedence over what the stable tree holds for
/// the same slot.
fn merge_siblings(precomputed: &[Interval], inherited: Vec<(Interval, Interval)>) -> Vec<Interval> {
    let mut merged = precomputed.to_vec();
    for (slot, node) in inherited {
        if find_sibling(precomputed, &slot).is_none() {
            merged.push(node);
        }
    }
    merged
}

fn validate_pages(reply: &TicketReply, pages: &[PageRecord]) -> Result<(), MetadataError> {
    let page_size = reply.stable_root.page_size;
    let range = &reply.interval;

    if page_size == 0
        || reply.root_size % page_size != 0
        || !is_power_of_two(reply.root_size / page_size)
    {
        return Err(MetadataError::InvalidRange(format!(
            "root size {} is not a power of two multiple of page size {}",
            reply.root_size, page_size
        )));
    }

    let fits = range
        .offset
        .checked_add(range.size)
        .is_some_and(|end| end <= reply.root_size);
    if range.version != reply.ticket || !fits {
        return Err(MetadataError::InvalidRange(format!(
            "range {range} does not fit version {} of size {}",
            reply.ticket, reply.root_size
        )));
    }

    if pages.is_empty() || pages.len() as u64 * page_size != range.size {
        return Err(MetadataError::InvalidRange(format!(
            "{} pages do not cover range {range}",
            pages.len()
        )));
    }

    for (expected, page) in range.pages(page_size).zip(pages) {
        if page.interval != expected {
            return Err(MetadataError::InvalidRange(format!(
                "expected page {expected}, found {}",
                page.interval
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use blobseer_storage::{Dht, MemoryDht};

    use super::*;
    use crate::{PageKey, ProviderDesc};

    fn record(interval: Interval) -> PageRecord {
        PageRecord::new(
            interval,
            PageKey::for_chunk(&interval),
            vec![ProviderDesc::new("localhost", "1235")],
        )
    }

    fn reply(range: Interval, root_size: u64, stable_root: VersionRoot) -> TicketReply {
        TicketReply {
            ticket: range.version,
            interval: range,
            stable_root,
            root_size,
            left: vec![],
            right: vec![],
        }
    }

    #[tokio::test]
    async fn it_writes_leaves_and_internal_nodes() -> Result<()> {
        let tree = IntervalTree::new(Dht::new(MemoryDht::default()));
        let range = Interval::new(1, 1, 0, 24);
        let pages = range.pages(8).map(record).collect();

        let root = tree
            .write_record_locations(&reply(range, 32, VersionRoot::initial(1, 8, 1)), pages)
            .await?;

        assert_eq!(root, Interval::new(1, 1, 0, 32));
        assert_eq!(
            tree.node(&root).await?,
            TreeNode::Internal {
                left: Some(Interval::new(1, 1, 0, 16)),
                right: Some(Interval::new(1, 1, 16, 16)),
            }
        );
        assert_eq!(
            tree.node(&Interval::new(1, 1, 16, 16)).await?,
            TreeNode::Internal {
                left: Some(Interval::new(1, 1, 16, 8)),
                right: None,
            }
        );
        assert!(tree.node(&Interval::new(1, 1, 8, 8)).await?.is_leaf());
        assert_eq!(
            tree.providers(&PageKey::for_chunk(&Interval::new(1, 1, 8, 8)))
                .await?,
            vec![ProviderDesc::new("localhost", "1235")]
        );

        Ok(())
    }

    #[tokio::test]
    async fn it_links_to_precomputed_siblings_without_reading_them() -> Result<()> {
        let tree = IntervalTree::new(Dht::new(MemoryDht::default()));
        let range = Interval::new(1, 3, 16, 8);
        let mut reply = reply(range, 32, VersionRoot::initial(1, 8, 1));
        // Version 2 is still writing [0, 8)
        reply.left = vec![Interval::new(1, 2, 0, 16)];

        let root = tree
            .write_record_locations(&reply, vec![record(range)])
            .await?;

        assert_eq!(
            tree.node(&root).await?,
            TreeNode::Internal {
                left: Some(Interval::new(1, 2, 0, 16)),
                right: Some(Interval::new(1, 3, 16, 16)),
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn it_inherits_the_stable_tree_into_a_larger_root() -> Result<()> {
        let tree = IntervalTree::new(Dht::new(MemoryDht::default()));

        let first = Interval::new(1, 1, 0, 8);
        let root = tree
            .write_record_locations(
                &reply(first, 8, VersionRoot::initial(1, 8, 1)),
                vec![record(first)],
            )
            .await?;
        assert_eq!(root, first);

        let stable = VersionRoot {
            version: 1,
            node: root,
            current_size: 8,
            ..VersionRoot::initial(1, 8, 1)
        };
        let second = Interval::new(1, 2, 24, 8);
        let root = tree
            .write_record_locations(&reply(second, 32, stable), vec![record(second)])
            .await?;

        assert_eq!(
            tree.node(&root).await?,
            TreeNode::Internal {
                left: Some(Interval::new(1, 1, 0, 8)),
                right: Some(Interval::new(1, 2, 16, 16)),
            }
        );
        assert_eq!(
            tree.node(&Interval::new(1, 2, 16, 16)).await?,
            TreeNode::Internal {
                left: None,
                right: Some(second),
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn it_rejects_pages_that_do_not_cover_the_range() -> Result<()> {
        let tree = IntervalTree::new(Dht::new(MemoryDht::default()));
        let range = Interval::new(1, 1, 0, 16);

        let result = tree
            .write_record_locations(
                &reply(range, 16, VersionRoot::initial(1, 8, 1)),
                vec![record(Interval::new(1, 1, 8, 8))],
            )
            .await;

        assert!(matches!(result, Err(MetadataError::InvalidRange(_))));

        Ok(())
    }
}
