use serde::{Deserialize, Serialize};

use crate::{Interval, PageKey};

/// A node of the interval tree, stored in the DHT under its [`Interval`].
///
/// An internal node links its two halves. A child may belong to any earlier
/// version, and may be smaller than the half it stands for when the blob grew
/// after that child was written. A missing child is a hole: no version ever
/// wrote the bytes under it, and they read as zeroes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeNode {
    /// A single page
    Leaf {
        /// Key under which the page's provider list is stored
        page: PageKey,
    },
    /// Two halves of a larger range
    Internal {
        /// The lower half
        left: Option<Interval>,
        /// The upper half
        right: Option<Interval>,
    },
}

impl TreeNode {
    /// Returns true if this is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    /// The children that are not holes, lower half first
    pub fn children(&self) -> impl Iterator<Item = Interval> {
        let (left, right) = match self {
            TreeNode::Leaf { .. } => (None, None),
            TreeNode::Internal { left, right } => (*left, *right),
        };
        left.into_iter().chain(right)
    }
}
