use serde::{Deserialize, Serialize};

use crate::{Interval, PageKey};

/// The two kinds of records the tree keeps in the DHT share one key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DhtKey {
    /// A [`crate::TreeNode`], written once and never changed
    Node(Interval),
    /// The [`crate::ProviderList`] of a page, replaced as replicas move
    Page(PageKey),
}

impl From<Interval> for DhtKey {
    fn from(value: Interval) -> Self {
        DhtKey::Node(value)
    }
}

impl From<PageKey> for DhtKey {
    fn from(value: PageKey) -> Self {
        DhtKey::Page(value)
    }
}
