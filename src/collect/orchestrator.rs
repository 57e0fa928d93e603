//! Collection orchestrator
//!
//! Enumerates stored CCAs addressed to internet relays, drives one
//! streaming session per CCA, feeds delivered cargo back into the message
//! store and deletes each CCA once its exchange completes. Failures are
//! scoped per CCA: a failed session leaves its authorization in place and
//! the pass moves on.

use crate::collect::error::CollectResult;
use crate::collect::sync_client::{CargoDelivery, SyncClient};
use crate::collect::types::{
    CcaSession, CollectReport, FailureReason, SessionOutcome, SessionPhase,
};
use crate::envelope::{MessageKind, RecipientType};
use crate::store::{BlobRepository, MessageIndex, MessageStore, StoreError, StoredMessage};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_CONCURRENT_SESSIONS: usize = 4;

pub struct CargoCollector {
    index: Arc<dyn MessageIndex>,
    blobs: Arc<dyn BlobRepository>,
    store: Arc<MessageStore>,
    client: Arc<dyn SyncClient>,
    idle_timeout: Duration,
    max_concurrent_sessions: usize,
}

impl CargoCollector {
    pub fn new(
        index: Arc<dyn MessageIndex>,
        blobs: Arc<dyn BlobRepository>,
        store: Arc<MessageStore>,
        client: Arc<dyn SyncClient>,
    ) -> Self {
        Self {
            index,
            blobs,
            store,
            client,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_concurrent_sessions: DEFAULT_MAX_CONCURRENT_SESSIONS,
        }
    }

    /// Sessions idle beyond this duration count as transport failures.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn max_concurrent_sessions(mut self, limit: usize) -> Self {
        self.max_concurrent_sessions = limit.max(1);
        self
    }

    /// Run one collection pass over every stored CCA.
    ///
    /// Sessions for different CCAs run concurrently up to the configured
    /// limit. Cancelling the token promptly closes open sessions; every
    /// CCA not yet deleted at that point is retained.
    pub async fn collect(&self, cancel: &CancellationToken) -> CollectResult<CollectReport> {
        let ccas = self
            .index
            .query(RecipientType::Internet, MessageKind::CollectionAuthorization)
            .await?;

        tracing::debug!("collection pass over {} stored CCAs", ccas.len());

        let outcomes: Vec<SessionOutcome> = futures::stream::iter(ccas)
            .map(|cca| self.run_session(cca, cancel))
            .buffer_unordered(self.max_concurrent_sessions)
            .collect()
            .await;

        let mut report = CollectReport::default();
        for outcome in &outcomes {
            report.absorb(outcome);
        }
        tracing::info!("{report}");
        Ok(report)
    }

    async fn run_session(&self, cca: StoredMessage, cancel: &CancellationToken) -> SessionOutcome {
        let mut session = CcaSession::new(cca);

        let data = match self.blobs.read(&session.cca.blob_location).await {
            Ok(data) => data,
            Err(StoreError::DataNotFound(location)) => {
                tracing::warn!(
                    "CCA {} data not found at {location}; authorization retained",
                    session.cca.message_id
                );
                session.fail(FailureReason::DataNotFound);
                return SessionOutcome::Failed(FailureReason::DataNotFound);
            }
            Err(err) => {
                tracing::warn!("failed to read CCA {} data: {err}", session.cca.message_id);
                let reason = FailureReason::Storage(err.to_string());
                session.fail(reason.clone());
                return SessionOutcome::Failed(reason);
            }
        };

        if cancel.is_cancelled() {
            return SessionOutcome::Cancelled;
        }

        session.begin();

        let remote = match self.client.build(&session.cca.recipient_address).await {
            Ok(remote) => remote,
            Err(err) => {
                let reason = FailureReason::Transport(err.to_string());
                tracing::warn!(
                    "could not reach {} for CCA {}: {err}",
                    session.cca.recipient_address,
                    session.cca.message_id
                );
                session.fail(reason.clone());
                return SessionOutcome::Failed(reason);
            }
        };

        let delivery = CargoDelivery {
            local_id: session.cca.message_id.clone(),
            data,
        };
        let mut stream = match remote.collect(delivery).await {
            Ok(stream) => stream,
            Err(err) => {
                let reason = FailureReason::Transport(err.to_string());
                session.fail(reason.clone());
                return SessionOutcome::Failed(reason);
            }
        };

        let mut stored = 0u64;
        let mut rejected = 0u64;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(
                        "pass cancelled; closing session for CCA {}, authorization retained",
                        session.cca.message_id
                    );
                    return SessionOutcome::Cancelled;
                }
                next = tokio::time::timeout(self.idle_timeout, stream.next()) => next,
            };

            let frame = match next {
                // Idle sessions count as transport failures
                Err(_elapsed) => {
                    let reason =
                        FailureReason::Transport(format!("idle for {:?}", self.idle_timeout));
                    tracing::warn!(
                        "session for CCA {} idle too long; authorization retained",
                        session.cca.message_id
                    );
                    session.fail(reason.clone());
                    return SessionOutcome::Failed(reason);
                }
                Ok(None) => break,
                Ok(Some(Err(err))) => {
                    let reason = FailureReason::Transport(err.to_string());
                    tracing::warn!(
                        "session for CCA {} failed mid-stream: {err}; authorization retained",
                        session.cca.message_id
                    );
                    session.fail(reason.clone());
                    return SessionOutcome::Failed(reason);
                }
                Ok(Some(Ok(frame))) => frame,
            };

            // Per-item storage failures never abort the session
            match self.store.store_collected_cargo(&frame).await {
                Ok(outcome) if outcome.is_success() => stored += 1,
                Ok(outcome) => {
                    tracing::warn!(
                        "collected cargo rejected ({}) during session for CCA {}",
                        outcome.label(),
                        session.cca.message_id
                    );
                    rejected += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        "failed to store collected cargo during session for CCA {}: {err}",
                        session.cca.message_id
                    );
                    rejected += 1;
                }
            }
        }

        // Normal close acknowledges consumption: drop the CCA record, then
        // its blob.
        if let Err(err) = self.store.delete_message(&session.cca).await {
            let reason = FailureReason::Storage(err.to_string());
            tracing::warn!(
                "session for CCA {} closed but cleanup failed: {err}",
                session.cca.message_id
            );
            session.fail(reason.clone());
            return SessionOutcome::Failed(reason);
        }

        session.complete();
        debug_assert_eq!(*session.phase(), SessionPhase::Completed);
        SessionOutcome::Completed { stored, rejected }
    }
}
