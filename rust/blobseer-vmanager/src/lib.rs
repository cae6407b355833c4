#![warn(missing_docs)]

//! The version manager is the sole authority over the version numbers of
//! every blob.
//!
//! Writers ask it for a ticket before building their version's tree, and
//! publish the ticket once the tree is in the DHT. Versions become visible to
//! readers strictly in ticket order, however out of order their writers
//! finish:
//!
//! ```rust
//! # fn example() -> Result<(), blobseer_vmanager::VersionManagerError> {
//! use blobseer_metadata::Interval;
//! use blobseer_vmanager::VersionManager;
//!
//! let manager = VersionManager::default();
//! let root = manager.create(8, 1)?;
//!
//! let first = manager.get_ticket(Interval::new(root.object_id, 0, 0, 8), false)?;
//! let second = manager.get_ticket(Interval::new(root.object_id, 0, 8, 8), false)?;
//!
//! manager.publish(second.interval)?;
//! assert_eq!(manager.get_root(root.object_id, 0)?.map(|root| root.version), Some(0));
//!
//! manager.publish(first.interval)?;
//! assert_eq!(manager.get_root(root.object_id, 0)?.map(|root| root.version), Some(2));
//! # Ok(())
//! # }
//! ```

mod error;
pub use error::*;

mod management;
pub use management::*;

mod manager;
pub use manager::*;

mod rpc;
pub use rpc::*;

mod state;
pub use state::*;
