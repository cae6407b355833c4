#![warn(missing_docs)]

//! This crate contains the DHT contract that versioned blob metadata is
//! persisted through, along with the record codec and an in-memory DHT.
//!
//! Keys and values travel through a [DhtBackend] as opaque byte buffers. A
//! [Dht] pairs a backend with an [Encoder] so that callers can read and write
//! typed records:
//!
//! ```rust
//! # async fn example() -> Result<(), blobseer_storage::DhtError> {
//! use blobseer_storage::{Dht, MemoryDht, PutOptions};
//!
//! let dht = Dht::new(MemoryDht::default());
//! let options = PutOptions::default();
//!
//! dht.write(&"key", &42u64, &options).await?;
//! assert_eq!(dht.read::<_, u64>(&"key").await?, Some(42));
//! # Ok(())
//! # }
//! ```
//!
//! Backends may be stacked: [CachedDht] fronts a backend with a read cache
//! and [MeasuredDht] counts the operations that reach the backend.

mod backend;
pub use backend::*;

mod cache;
pub use cache::*;

mod dht;
pub use dht::*;

mod encoder;
pub use encoder::*;

mod error;
pub use error::*;

mod hash;
pub use hash::*;

mod measure;
pub use measure::*;
