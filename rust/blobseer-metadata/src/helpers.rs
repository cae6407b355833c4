//! Walks over every node reachable from a version's root.
//!
//! Versions share every subtree they did not write, so the set of nodes
//! reachable from two roots shows exactly what a write added:
//!
//! ```no_run
//! use blobseer_metadata::{IntervalTree, TraversalOrder, Traversable, TreeNodes, VersionRoot};
//! use blobseer_storage::MemoryDht;
//!
//! # async fn example(tree: &IntervalTree<MemoryDht>, v1: &VersionRoot, v2: &VersionRoot) {
//! let before = tree.traverse(v1, TraversalOrder::BreadthFirst).collect_nodes().await;
//! let after = tree.traverse(v2, TraversalOrder::BreadthFirst).collect_nodes().await;
//! println!("Version 2 added {} nodes", after.difference(&before).count());
//! # }
//! ```

use std::collections::{BTreeSet, VecDeque};

use async_stream::try_stream;
use blobseer_storage::{DhtBackend, Encoder};
use futures_core::Stream;

use crate::{Interval, IntervalTree, MetadataError, TreeNode, VersionRoot};

/// Order in which [`Traversable::traverse`] visits a version's nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    /// Left subtree, then right subtree
    #[default]
    DepthFirst,
    /// Level by level, from the root down
    BreadthFirst,
}

/// Trait for traversing all nodes of one version of a tree.
pub trait Traversable {
    /// Returns an async stream of every node reachable from `root`, loading
    /// each node from the DHT as it is visited. Holes are skipped.
    fn traverse(
        &self,
        root: &VersionRoot,
        order: TraversalOrder,
    ) -> impl Stream<Item = Result<(Interval, TreeNode), MetadataError>>;
}

impl<Backend, Codec> Traversable for IntervalTree<Backend, Codec>
where
    Backend: DhtBackend,
    Codec: Encoder,
{
    fn traverse(
        &self,
        root: &VersionRoot,
        order: TraversalOrder,
    ) -> impl Stream<Item = Result<(Interval, TreeNode), MetadataError>> {
        let start = (!root.is_empty()).then_some(root.node);

        try_stream! {
            let mut pending: VecDeque<Interval> = start.into_iter().collect();

            while let Some(interval) = match order {
                TraversalOrder::DepthFirst => pending.pop_back(),
                TraversalOrder::BreadthFirst => pending.pop_front(),
            } {
                let node = self.node(&interval).await?;
                let children: Vec<Interval> = node.children().collect();
                match order {
                    // Pushed right first so the left child is popped first
                    TraversalOrder::DepthFirst => pending.extend(children.into_iter().rev()),
                    TraversalOrder::BreadthFirst => pending.extend(children),
                }
                yield (interval, node);
            }
        }
    }
}

/// A stream of tree nodes.
pub trait TreeNodes: Stream<Item = Result<(Interval, TreeNode), MetadataError>> {
    /// Collects the intervals of all visited nodes, ignoring errors.
    fn collect_nodes(self) -> impl std::future::Future<Output = BTreeSet<Interval>>;
}

impl<S> TreeNodes for S
where
    S: Stream<Item = Result<(Interval, TreeNode), MetadataError>>,
{
    fn collect_nodes(self) -> impl std::future::Future<Output = BTreeSet<Interval>> {
        use futures_util::StreamExt;
        self.filter_map(|result| async { result.ok().map(|(interval, _)| interval) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use blobseer_storage::{Dht, MemoryDht};
    use futures_util::TryStreamExt;

    use super::*;
    use crate::{PageKey, PageRecord, ProviderDesc, TicketReply};

    #[tokio::test]
    async fn it_visits_nodes_in_the_requested_order() -> Result<()> {
        let tree = IntervalTree::new(Dht::new(MemoryDht::default()));
        let range = Interval::new(1, 1, 0, 24);
        let pages = range
            .pages(8)
            .map(|page| {
                PageRecord::new(
                    page,
                    PageKey::for_chunk(&page),
                    vec![ProviderDesc::new("localhost", "1235")],
                )
            })
            .collect();
        let reply = TicketReply {
            ticket: 1,
            interval: range,
            stable_root: VersionRoot::initial(1, 8, 1),
            root_size: 32,
            left: vec![],
            right: vec![],
        };
        let root = VersionRoot {
            version: 1,
            node: tree.write_record_locations(&reply, pages).await?,
            current_size: 24,
            ..VersionRoot::initial(1, 8, 1)
        };

        let offsets = |nodes: Vec<(Interval, TreeNode)>| {
            nodes
                .into_iter()
                .map(|(interval, _)| (interval.offset, interval.size))
                .collect::<Vec<_>>()
        };

        let depth_first: Vec<_> = tree
            .traverse(&root, TraversalOrder::DepthFirst)
            .try_collect()
            .await?;
        assert_eq!(
            offsets(depth_first),
            vec![(0, 32), (0, 16), (0, 8), (8, 8), (16, 16), (16, 8)]
        );

        let breadth_first: Vec<_> = tree
            .traverse(&root, TraversalOrder::BreadthFirst)
            .try_collect()
            .await?;
        assert_eq!(
            offsets(breadth_first),
            vec![(0, 32), (0, 16), (16, 16), (0, 8), (8, 8), (16, 8)]
        );

        Ok(())
    }
}
