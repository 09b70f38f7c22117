//! Block serialization and the on-disk block store.
#![deny(unsafe_code)]

mod error;
pub mod format;
pub mod key;
mod store;

pub use error::{SerializeError, StoreError};
pub use format::{FORMAT_VERSION, OLDEST_READABLE_VERSION, deserialize_block, serialize_block};
pub use key::{block_key, key_to_block};
pub use store::{BlockStore, LoadOutcome};
