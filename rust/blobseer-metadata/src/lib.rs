#![warn(missing_docs)]

//! This crate persists the metadata of versioned blobs as a copy-on-write
//! segment tree stored in a DHT.
//!
//! A blob is split into fixed-size pages. Every node of the tree is addressed
//! by an [`Interval`] - `(object id, version, offset, size)` - so the DHT key
//! of any node can be computed without an index. A write materializes the
//! leaves it touched plus one internal node per level on the path to the
//! root, and links everything else to subtrees of earlier versions:
//!
//! ```rust
//! # async fn example() -> Result<(), blobseer_metadata::MetadataError> {
//! use blobseer_metadata::{
//!     Interval, IntervalTree, PageKey, PageRecord, ProviderDesc, TicketReply, VersionRoot,
//! };
//! use blobseer_storage::{Dht, MemoryDht};
//!
//! let tree = IntervalTree::new(Dht::new(MemoryDht::default()));
//! let initial = VersionRoot::initial(1, 8, 1);
//!
//! // Version 1 writes the first page of a 16 byte tree
//! let reply = TicketReply {
//!     ticket: 1,
//!     interval: Interval::new(1, 1, 0, 8),
//!     stable_root: initial,
//!     root_size: 16,
//!     left: vec![],
//!     right: vec![],
//! };
//! let page = Interval::new(1, 1, 0, 8);
//! let root = tree
//!     .write_record_locations(
//!         &reply,
//!         vec![PageRecord::new(page, PageKey::for_chunk(&page), vec![ProviderDesc::new("p1", "9000")])],
//!     )
//!     .await?;
//!
//! assert_eq!(root, Interval::new(1, 1, 0, 16));
//! # Ok(())
//! # }
//! ```

mod builder;

mod error;
pub use error::*;

mod interval;
pub use interval::*;

mod key;
pub use key::*;

mod node;
pub use node::*;

mod page;
pub use page::*;

mod reader;

mod replica;
pub use replica::*;

mod root;
pub use root::*;

mod ticket;
pub use ticket::*;

mod tree;
pub use tree::*;

/// Helpers for testing and diagnostics.
///
/// Walks every node reachable from a version's root, which makes structural
/// sharing between versions observable.
#[cfg(any(test, feature = "helpers"))]
mod helpers;
#[cfg(any(test, feature = "helpers"))]
pub use helpers::*;
