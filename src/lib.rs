//! Store-and-forward relay core for a delay-tolerant-network courier.
//!
//! A courier physically carries encrypted message bundles ("cargo")
//! between disconnected endpoints and internet relays. This crate covers
//! the relay core only:
//!
//! - [`store::MessageStore`] ingests binary cargo and cargo-collection
//!   authorizations (CCAs), validating each frame at the envelope level
//!   and enforcing a storage quota before persisting.
//! - [`collect::CargoCollector`] runs collection passes: one streaming
//!   session per stored CCA, retrieved cargo re-admitted under the same
//!   rules, the CCA deleted once its exchange completes.
//!
//! Payload contents are never decrypted or interpreted, and pass
//! scheduling is the caller's concern.

pub mod collect;
pub mod config;
pub mod envelope;
pub mod store;

pub use collect::{
    CargoCollector, CargoDelivery, CargoStream, CollectError, CollectReport, CollectResult,
    FailureReason, SessionOutcome, SyncClient, SyncSession, TransportError,
};
pub use config::CourierConfig;
pub use envelope::{
    Envelope, EnvelopeBuilder, EnvelopeError, EnvelopeResult, Identity, MessageKind, Recipient,
    RecipientType,
};
pub use store::{
    BlobRepository, FsBlobRepository, MessageIndex, MessageStore, SqliteMessageIndex, StorageUsage,
    StoreError, StoreOutcome, StoreResult, StoredMessage, UsageReporter,
};
