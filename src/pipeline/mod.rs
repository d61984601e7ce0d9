//! The identity sync pipeline: upsert, lookup, then session, once per identity change.

mod diagnostics;
mod orchestrator;
mod outcome;

pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, RunContext, TracingSink};
pub use orchestrator::Orchestrator;
pub use outcome::{RunOutcome, SkipReason};
