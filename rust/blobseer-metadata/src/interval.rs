use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Identifier of a blob, assigned by the version manager starting at 1.
pub type ObjectId = u32;

/// Version number of a blob. Version 0 is the empty blob every object starts
/// from; the first write produces version 1.
pub type Version = u32;

/// Which half of its parent an [`Interval`] occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// The lower half, starting at the parent's offset
    Left,
    /// The upper half, ending at the parent's end
    Right,
}

/// The identity of a tree node: a byte range of one version of one object.
///
/// Intervals double as DHT keys, so parents and siblings of any node can be
/// derived from its interval alone. Node sizes are powers of two multiplied
/// by the page size, and offsets are multiples of the node size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    /// The object the node belongs to
    pub object_id: ObjectId,
    /// The version that wrote the node
    pub version: Version,
    /// First byte covered by the node
    pub offset: u64,
    /// Number of bytes covered by the node
    pub size: u64,
}

impl Interval {
    /// Create a new [`Interval`]
    pub const fn new(object_id: ObjectId, version: Version, offset: u64, size: u64) -> Self {
        Self {
            object_id,
            version,
            offset,
            size,
        }
    }

    /// One past the last byte covered by this interval
    pub const fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// True if the byte ranges overlap. Versions and object ids are ignored.
    pub fn intersects(&self, other: &Interval) -> bool {
        self.size > 0 && other.size > 0 && self.offset < other.end() && other.offset < self.end()
    }

    /// True if `other`'s byte range lies entirely inside this one.
    pub fn contains(&self, other: &Interval) -> bool {
        self.offset <= other.offset && other.end() <= self.end()
    }

    /// The interval of the parent node, at the same version, together with
    /// the half of the parent this interval occupies.
    pub fn parent(&self) -> (Interval, Position) {
        let size = self.size * 2;
        if self.offset % size == 0 {
            (
                Interval::new(self.object_id, self.version, self.offset, size),
                Position::Left,
            )
        } else {
            (
                Interval::new(self.object_id, self.version, self.offset - self.size, size),
                Position::Right,
            )
        }
    }

    /// The interval that shares this one's parent.
    pub fn sibling(&self) -> Interval {
        match self.parent() {
            (_, Position::Left) => Interval {
                offset: self.offset + self.size,
                ..*self
            },
            (_, Position::Right) => Interval {
                offset: self.offset - self.size,
                ..*self
            },
        }
    }

    /// The lower and upper halves of this interval.
    pub fn halves(&self) -> (Interval, Interval) {
        let half = self.size / 2;
        (
            Interval {
                size: half,
                ..*self
            },
            Interval {
                offset: self.offset + half,
                size: half,
                ..*self
            },
        )
    }

    /// The same byte range, attributed to another version.
    pub fn at_version(&self, version: Version) -> Interval {
        Interval { version, ..*self }
    }

    /// True for the root of an object's version 0, which is never persisted.
    pub fn is_unwritten(&self) -> bool {
        self.version == 0
    }

    /// The page-sized intervals making up this one, in ascending order.
    pub fn pages(&self, page_size: u64) -> impl Iterator<Item = Interval> + '_ {
        let count = if page_size == 0 { 0 } else { self.size / page_size };
        (0..count).map(move |index| Interval {
            offset: self.offset + index * page_size,
            size: page_size,
            ..*self
        })
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.object_id, self.version, self.offset, self.size
        )
    }
}

/// True if `value` is a power of two. Zero is not.
pub fn is_power_of_two(value: u64) -> bool {
    value != 0 && value & (value - 1) == 0
}
