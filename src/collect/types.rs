use crate::store::StoredMessage;

/// Why a collection session failed. In every case the CCA is retained
/// for a future pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The CCA's blob is missing from the repository
    DataNotFound,
    /// Session-level transport failure, including idle timeout
    Transport(String),
    /// Index or blob infrastructure failure while closing the session
    Storage(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::DataNotFound => f.write_str("data not found"),
            FailureReason::Transport(msg) => write!(f, "transport: {msg}"),
            FailureReason::Storage(msg) => write!(f, "storage: {msg}"),
        }
    }
}

/// Lifecycle of one per-CCA streaming session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Pending,
    Syncing,
    Completed,
    Failed(FailureReason),
}

/// Ephemeral per-CCA session state.
pub struct CcaSession {
    pub cca: StoredMessage,
    phase: SessionPhase,
}

impl CcaSession {
    pub fn new(cca: StoredMessage) -> Self {
        Self {
            cca,
            phase: SessionPhase::Pending,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn begin(&mut self) {
        debug_assert_eq!(self.phase, SessionPhase::Pending);
        self.phase = SessionPhase::Syncing;
        tracing::debug!("session for CCA {} syncing", self.cca.message_id);
    }

    pub fn complete(&mut self) {
        debug_assert_eq!(self.phase, SessionPhase::Syncing);
        self.phase = SessionPhase::Completed;
        tracing::debug!("session for CCA {} completed", self.cca.message_id);
    }

    pub fn fail(&mut self, reason: FailureReason) {
        self.phase = SessionPhase::Failed(reason.clone());
        tracing::debug!("session for CCA {} failed: {reason}", self.cca.message_id);
    }
}

/// Outcome of one per-CCA session within a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Session closed normally; the CCA was deleted.
    Completed { stored: u64, rejected: u64 },
    /// Session failed; the CCA was retained.
    Failed(FailureReason),
    /// The pass was cancelled mid-session; the CCA was retained.
    Cancelled,
}

/// Summary of one collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub sessions_completed: u64,
    pub sessions_failed: u64,
    pub sessions_cancelled: u64,
    pub cargo_stored: u64,
    pub cargo_rejected: u64,
}

impl CollectReport {
    pub(crate) fn absorb(&mut self, outcome: &SessionOutcome) {
        match outcome {
            SessionOutcome::Completed { stored, rejected } => {
                self.sessions_completed += 1;
                self.cargo_stored += stored;
                self.cargo_rejected += rejected;
            }
            SessionOutcome::Failed(_) => self.sessions_failed += 1,
            SessionOutcome::Cancelled => self.sessions_cancelled += 1,
        }
    }
}

impl std::fmt::Display for CollectReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Collection pass: {} completed, {} failed, {} cancelled; {} cargo stored, {} rejected",
            self.sessions_completed,
            self.sessions_failed,
            self.sessions_cancelled,
            self.cargo_stored,
            self.cargo_rejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_absorbs_outcomes() {
        let mut report = CollectReport::default();
        report.absorb(&SessionOutcome::Completed {
            stored: 3,
            rejected: 1,
        });
        report.absorb(&SessionOutcome::Failed(FailureReason::DataNotFound));
        report.absorb(&SessionOutcome::Cancelled);

        assert_eq!(report.sessions_completed, 1);
        assert_eq!(report.sessions_failed, 1);
        assert_eq!(report.sessions_cancelled, 1);
        assert_eq!(report.cargo_stored, 3);
        assert_eq!(report.cargo_rejected, 1);
    }
}
