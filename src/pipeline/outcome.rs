use crate::error::{Stage, SyncError};

/// Why an identity-change event did not start a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SignedOut,
    MissingEmail,
    /// Same identity as the run already in flight or completed.
    Duplicate,
    ShutDown,
}

/// Terminal result of one identity-change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Established { email: String, external_id: String },
    Failed { stage: Stage, error: SyncError },
    Skipped(SkipReason),
    /// A newer event or teardown made the run stale; it stopped before `stage`
    /// (or, for `Login`, before installing the credential) and its result was discarded.
    Superseded { stage: Stage },
}

impl RunOutcome {
    pub fn is_established(&self) -> bool {
        matches!(self, RunOutcome::Established { .. })
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            RunOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}
