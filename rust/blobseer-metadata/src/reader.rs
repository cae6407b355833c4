use blobseer_storage::{DhtBackend, Encoder};
use tracing::trace;

use crate::{
    DhtKey, Interval, IntervalTree, MetadataError, PageKey, ProviderList, ReplicaSelection,
    TreeNode, VersionRoot,
};

impl<Backend, Codec> IntervalTree<Backend, Codec>
where
    Backend: DhtBackend,
    Codec: Encoder,
{
    /// Resolve the pages of `[offset, offset + size)` in the version `root`.
    ///
    /// The range must be page aligned. The result holds one entry per page,
    /// in order: a [`ReplicaSelection`] over the providers of the page, or
    /// `None` for a page no version ever wrote.
    ///
    /// The tree is descended one level at a time, with every node of a level
    /// fetched concurrently. A node or provider list that is referenced but
    /// missing fails the whole read.
    pub async fn read_record_locations(
        &self,
        root: &VersionRoot,
        offset: u64,
        size: u64,
    ) -> Result<Vec<Option<ReplicaSelection>>, MetadataError> {
        let page_size = root.page_size;
        if page_size == 0 || size == 0 || offset % page_size != 0 || size % page_size != 0 {
            return Err(MetadataError::InvalidRange(format!(
                "[{offset}, +{size}) is not aligned to pages of {page_size} bytes"
            )));
        }
        if offset.checked_add(size).is_none() {
            return Err(MetadataError::InvalidRange(format!(
                "[{offset}, +{size}) overflows the address space"
            )));
        }

        let range = Interval::new(root.object_id, root.version, offset, size);
        let page_count = (size / page_size) as usize;
        let mut slots: Vec<Option<ReplicaSelection>> = (0..page_count).map(|_| None).collect();

        if root.is_empty() || !root.node.intersects(&range) {
            return Ok(slots);
        }

        let mut frontier = vec![root.node];
        let mut leaves: Vec<(usize, PageKey)> = Vec::new();
        let mut depth = 0usize;

        while !frontier.is_empty() {
            let keys: Vec<DhtKey> = frontier.iter().copied().map(DhtKey::Node).collect();
            let nodes: Vec<Option<TreeNode>> = self.dht.read_many(&keys).await?;

            let mut next = Vec::new();
            for (interval, node) in frontier.into_iter().zip(nodes) {
                match node.ok_or(MetadataError::MissingNode(interval))? {
                    TreeNode::Leaf { page } => {
                        if interval.size != page_size || interval.offset < offset {
                            return Err(MetadataError::MalformedTree(format!(
                                "leaf {interval} does not hold a page of range {range}"
                            )));
                        }
                        leaves.push((((interval.offset - offset) / page_size) as usize, page));
                    }
                    node @ TreeNode::Internal { .. } => {
                        next.extend(node.children().filter(|child| child.intersects(&range)));
                    }
                }
            }

            frontier = next;
            depth += 1;
        }

        let keys: Vec<DhtKey> = leaves.iter().map(|(_, page)| DhtKey::Page(*page)).collect();
        let lists: Vec<Option<ProviderList>> = self.dht.read_many(&keys).await?;

        for ((index, page), providers) in leaves.into_iter().zip(lists) {
            let providers = providers.ok_or(MetadataError::MissingProviders(page))?;
            match slots.get_mut(index) {
                Some(slot) => *slot = Some(ReplicaSelection::new(page, providers)),
                None => {
                    return Err(MetadataError::MalformedTree(format!(
                        "page {page} lies outside range {range}"
                    )));
                }
            }
        }

        trace!(
            "Resolved {} pages of {range} over {depth} levels",
            slots.iter().filter(|slot| slot.is_some()).count()
        );

        Ok(slots)
    }
}
