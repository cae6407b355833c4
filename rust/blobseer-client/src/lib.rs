#![warn(missing_docs)]

//! This crate is the client side of the blob store: it reads and writes
//! whole pages of versioned blobs.
//!
//! An [`ObjectHandler`] ties together the version manager, the metadata tree
//! in the DHT, the providers that hold page bytes and the placement service
//! that picks them:
//!
//! ```rust
//! # async fn example() -> Result<(), blobseer_client::ClientError> {
//! use blobseer_client::{Config, MemoryProviders, ObjectHandler, RoundRobinPlacement};
//! use blobseer_metadata::ProviderDesc;
//! use blobseer_storage::MemoryDht;
//! use blobseer_vmanager::VersionManager;
//!
//! let mut handler = ObjectHandler::new(
//!     VersionManager::default(),
//!     MemoryDht::default(),
//!     MemoryProviders::default(),
//!     RoundRobinPlacement::new(vec![ProviderDesc::new("localhost", "1235")]),
//!     Config::default(),
//! )?;
//!
//! let object_id = handler.create(4, 1).await?;
//! handler.write(0, b"blobseer").await?;
//! handler.open(object_id).await?;
//!
//! assert_eq!(handler.read(4, 4).await?, b"seer".to_vec());
//! # Ok(())
//! # }
//! ```

mod config;
pub use config::*;

mod error;
pub use error::*;

mod handler;
pub use handler::*;

mod placement;
pub use placement::*;

mod providers;
pub use providers::*;
