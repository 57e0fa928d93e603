//! Message store
//!
//! Orchestrates codec, admission and persistence for the two message
//! kinds the courier carries: cargo and collection authorizations (CCAs).

use crate::envelope::{Envelope, MessageKind, RecipientType};
use crate::store::blob::BlobRepository;
use crate::store::error::StoreResult;
use crate::store::index::MessageIndex;
use crate::store::quota::UsageReporter;
use crate::store::types::{StorageUsage, StoreOutcome, StoredMessage};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct MessageStore {
    index: Arc<dyn MessageIndex>,
    blobs: Arc<dyn BlobRepository>,
    usage: UsageReporter,
    /// Serializes the admission-check -> blob-write -> index-insert
    /// sequence; the quota check and the write form one logical
    /// reservation.
    write_lock: Mutex<()>,
}

impl MessageStore {
    pub fn new(
        index: Arc<dyn MessageIndex>,
        blobs: Arc<dyn BlobRepository>,
        usage: UsageReporter,
    ) -> Self {
        Self {
            index,
            blobs,
            usage,
            write_lock: Mutex::new(()),
        }
    }

    /// Current storage usage snapshot.
    pub async fn usage(&self) -> StoreResult<StorageUsage> {
        self.usage.get().await
    }

    /// Ingest a cargo frame destined for a recipient of the given type.
    pub async fn store_cargo(
        &self,
        bytes: &[u8],
        recipient_type: RecipientType,
    ) -> StoreResult<StoreOutcome> {
        let envelope = match Envelope::decode(bytes, MessageKind::Cargo) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!("malformed cargo received: {err}");
                return Ok(StoreOutcome::Malformed);
            }
        };

        if let Err(err) = envelope.validate(recipient_type) {
            tracing::warn!("invalid cargo received: {err}");
            return Ok(StoreOutcome::Invalid);
        }

        self.persist(&envelope, bytes, MessageKind::Cargo, recipient_type)
            .await
    }

    /// Ingest a collection authorization. CCAs always address an internet
    /// relay and are keyed by the envelope's internet-style address.
    pub async fn store_cca(&self, bytes: &[u8]) -> StoreResult<StoreOutcome> {
        let envelope = match Envelope::decode(bytes, MessageKind::CollectionAuthorization) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!("malformed CCA received: {err}");
                return Ok(StoreOutcome::Malformed);
            }
        };

        if let Err(err) = envelope.validate(RecipientType::Internet) {
            tracing::warn!("invalid CCA received: {err}");
            return Ok(StoreOutcome::Invalid);
        }

        self.persist(
            &envelope,
            bytes,
            MessageKind::CollectionAuthorization,
            RecipientType::Internet,
        )
        .await
    }

    /// Ingest a cargo frame delivered by a collection session, resolving
    /// the recipient type from the item's own envelope: an internet-style
    /// address present means an internet recipient.
    pub async fn store_collected_cargo(&self, bytes: &[u8]) -> StoreResult<StoreOutcome> {
        let envelope = match Envelope::decode(bytes, MessageKind::Cargo) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!("malformed collected cargo received: {err}");
                return Ok(StoreOutcome::Malformed);
            }
        };

        let recipient_type = if envelope.recipient.internet_address.is_some() {
            RecipientType::Internet
        } else {
            RecipientType::LocalNetwork
        };

        if let Err(err) = envelope.validate(recipient_type) {
            tracing::warn!("invalid collected cargo received: {err}");
            return Ok(StoreOutcome::Invalid);
        }

        self.persist(&envelope, bytes, MessageKind::Cargo, recipient_type)
            .await
    }

    async fn persist(
        &self,
        envelope: &Envelope,
        bytes: &[u8],
        kind: MessageKind,
        recipient_type: RecipientType,
    ) -> StoreResult<StoreOutcome> {
        let recipient_address = match recipient_type {
            RecipientType::Internet => match &envelope.recipient.internet_address {
                Some(address) => address.clone(),
                None => {
                    tracing::warn!(
                        "{kind} {} addressed to internet without internet-style address",
                        envelope.id
                    );
                    return Ok(StoreOutcome::Invalid);
                }
            },
            RecipientType::LocalNetwork => envelope.recipient.node_id.clone(),
        };

        let size_bytes = bytes.len() as u64;

        let _guard = self.write_lock.lock().await;

        let usage = self.usage.get().await?;
        if !usage.admits(size_bytes) {
            tracing::warn!(
                "{kind} {} rejected, needs {size_bytes} bytes but {}",
                envelope.id,
                usage
            );
            return Ok(StoreOutcome::NoSpaceAvailable);
        }

        // Blob write precedes index insert, so the index never references
        // a missing blob.
        let blob_location = self.blobs.write(bytes).await?;
        let record = StoredMessage::from_envelope(
            envelope,
            kind,
            recipient_address,
            recipient_type,
            size_bytes,
            blob_location,
        );

        if let Err(err) = self.index.insert(&record).await {
            let _ = self.blobs.delete(&record.blob_location).await;
            return Err(err);
        }

        tracing::debug!("stored {kind} {} ({size_bytes} bytes)", record.message_id);
        Ok(StoreOutcome::Success(record))
    }

    /// Remove a stored message: index record first, then its blob, so a
    /// failure in between cannot leave an index entry without a blob.
    pub async fn delete_message(&self, record: &StoredMessage) -> StoreResult<()> {
        self.index.delete(&record.message_id).await?;
        self.blobs.delete(&record.blob_location).await?;
        Ok(())
    }

    /// Retention pass: purge every message past its expiry. Returns the
    /// number of messages removed.
    pub async fn delete_expired(&self) -> StoreResult<usize> {
        let expired = self.index.expired_before(Utc::now()).await?;
        for record in &expired {
            self.delete_message(record).await?;
            tracing::debug!("purged expired {} {}", record.kind, record.message_id);
        }
        Ok(expired.len())
    }
}
