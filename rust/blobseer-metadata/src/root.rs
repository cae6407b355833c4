use serde::{Deserialize, Serialize};

use crate::{Interval, ObjectId, Version};

/// Everything a reader needs to interpret one published version of a blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRoot {
    /// The blob this root describes
    pub object_id: ObjectId,
    /// The version this root describes
    pub version: Version,
    /// Root node of the tree. For clones this is a node of the source blob,
    /// so its object id and version may differ from the fields above.
    pub node: Interval,
    /// Size of one page in bytes, fixed for the lifetime of the blob
    pub page_size: u64,
    /// Logical size of the blob at this version
    pub current_size: u64,
    /// Replication factor requested when the blob was created
    pub ft_info: u32,
}

impl VersionRoot {
    /// Root of a freshly created blob: version 0, nothing written, a tree
    /// spanning a single page.
    pub fn initial(object_id: ObjectId, page_size: u64, ft_info: u32) -> Self {
        Self {
            object_id,
            version: 0,
            node: Interval::new(object_id, 0, 0, page_size),
            page_size,
            current_size: 0,
            ft_info,
        }
    }

    /// True if the tree of this version holds no nodes at all
    pub fn is_empty(&self) -> bool {
        self.node.is_unwritten()
    }
}
