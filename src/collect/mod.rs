//! Collection Orchestrator
//!
//! Drives the collection protocol: one streaming session per stored CCA,
//! delivered cargo re-admitted through the message store, the CCA deleted
//! only when its session closes normally. Retry across passes is the
//! system's only retry mechanism; scheduling passes is the caller's
//! concern.

pub mod error;
mod orchestrator;
pub mod sync_client;
pub mod types;

pub use error::{CollectError, CollectResult, TransportError};
pub use orchestrator::CargoCollector;
pub use sync_client::{CargoDelivery, CargoStream, SyncClient, SyncSession};
pub use types::{CcaSession, CollectReport, FailureReason, SessionOutcome, SessionPhase};
