use parking_lot::Mutex;
use tracing::warn;

use crate::error::{Stage, SyncError};

/// Identifies the run a diagnostic belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub email: String,
    pub external_id: String,
    pub generation: u64,
}

/// Receives every stage failure of a current run. Failures never reach the end user otherwise.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, stage: Stage, cause: &SyncError, context: &RunContext);
}

/// Default sink: one structured `warn` event per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, stage: Stage, cause: &SyncError, context: &RunContext) {
        warn!(
            stage = %stage,
            email = %context.email,
            external_id = %context.external_id,
            generation = context.generation,
            code = cause.code_str(),
            cause = %cause.cause(),
            "identity sync run failed"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub error: SyncError,
    pub context: RunContext,
}

/// Keeps every report in memory, for hosts that surface failures themselves.
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self { Self::default() }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.reports.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, stage: Stage, cause: &SyncError, context: &RunContext) {
        self.reports.lock().push(Diagnostic { stage, error: cause.clone(), context: context.clone() });
    }
}
