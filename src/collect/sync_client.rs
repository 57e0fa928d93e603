//! Remote sync client seam
//!
//! The streaming transport that carries collection sessions lives outside
//! this crate; the orchestrator only depends on these traits.

use crate::collect::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Descriptor presented to the remote relay when opening a session: the
/// courier-local id of the CCA and its raw frame.
#[derive(Debug, Clone)]
pub struct CargoDelivery {
    pub local_id: String,
    pub data: Vec<u8>,
}

/// Lazy, finite, non-restartable sequence of cargo frames yielded by a
/// session. Ends on remote close or with a transport error.
pub type CargoStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// One open streaming channel to a remote relay.
#[async_trait]
pub trait SyncSession: Send {
    /// Present the CCA and start collecting the cargo it releases.
    async fn collect(self: Box<Self>, delivery: CargoDelivery) -> Result<CargoStream, TransportError>;
}

/// Builds sessions against remote relays by recipient address.
#[async_trait]
pub trait SyncClient: Send + Sync {
    async fn build(&self, recipient_address: &str) -> Result<Box<dyn SyncSession>, TransportError>;
}
