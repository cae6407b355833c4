use serde::{Deserialize, Serialize};

use crate::{Interval, Version, VersionRoot};

/// What the version manager hands a writer along with its version number.
///
/// `left` and `right` name siblings of the write's boundary paths that were
/// written by versions still in flight. The builder links to them by key,
/// before those versions finish writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReply {
    /// The version assigned to the write
    pub ticket: Version,
    /// The range being written, with the assigned version. For appends the
    /// offset has been resolved by the version manager.
    pub interval: Interval,
    /// Latest version whose tree may be read, as of the assignment
    pub stable_root: VersionRoot,
    /// Span of the new version's tree
    pub root_size: u64,
    /// Siblings to the left of the write's leftmost leaf path
    pub left: Vec<Interval>,
    /// Siblings to the right of the write's rightmost leaf path
    pub right: Vec<Interval>,
}

/// Look up the node that stands for the tree slot `slot`.
///
/// A node written before the blob grew may be smaller than the slot it fills,
/// but always starts at the slot's offset.
pub fn find_sibling(list: &[Interval], slot: &Interval) -> Option<Interval> {
    list.iter()
        .find(|candidate| candidate.offset == slot.offset && candidate.size <= slot.size)
        .copied()
}
