pub mod config;
pub mod error;
pub mod identity;
pub mod session;
pub mod client;
pub mod pipeline;
pub mod cli;

pub use config::SyncConfig;
pub use error::{Cause, Stage, SyncError, SyncResult};
pub use identity::{BackendUserRecord, ExternalIdentity, IdentityEvents, IdentityFeed, UpsertPayload};
pub use pipeline::{Orchestrator, RunOutcome, SkipReason};
pub use session::{MemorySessionStore, SessionCredential, SessionStore};

// Debug-only printing helper: expands to eprintln! in test and debug builds and is absent otherwise.
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In release builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
