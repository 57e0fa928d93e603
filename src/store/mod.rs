//! Message Store
//!
//! Admission-controlled persistence for courier messages: quota/usage
//! reporting, the persistent message index, the blob repository and the
//! store pipeline tying them together.

pub mod blob;
pub mod error;
pub mod index;
pub mod quota;
pub mod store;
pub mod types;

pub use blob::{BlobRepository, FsBlobRepository};
pub use error::{StoreError, StoreResult};
pub use index::{MessageIndex, SqliteMessageIndex};
pub use quota::UsageReporter;
pub use store::MessageStore;
pub use types::{StorageUsage, StoreOutcome, StoredMessage};
