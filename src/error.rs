//! Error model for the identity sync pipeline.
//! Every stage failure carries the input it was attempted with and the underlying cause,
//! so the orchestrator can report it without re-deriving context.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use thiserror::Error;

use crate::identity::UpsertPayload;

/// Longest response body excerpt kept on a `Cause::Status`.
const BODY_EXCERPT_MAX: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Upsert,
    Lookup,
    Login,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Upsert => "upsert",
            Stage::Lookup => "lookup",
            Stage::Login => "login",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What actually went wrong underneath a stage failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    /// Backend answered with a non-success status.
    Status { status: u16, body: String },
    /// Connection, TLS or protocol error before a status was read.
    Transport(String),
    /// The stage did not resolve within its time bound.
    Timeout { after_ms: u64 },
    /// Success status but the body did not match the contract.
    Malformed(String),
}

impl Cause {
    pub fn status(status: u16, body: &str) -> Self {
        Cause::Status { status, body: excerpt(body) }
    }

    pub fn timeout(after: Duration) -> Self {
        Cause::Timeout { after_ms: after.as_millis() as u64 }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Cause::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Cause::Transport(_) | Cause::Timeout { .. })
    }
}

impl From<reqwest::Error> for Cause {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Cause::Malformed(err.to_string())
        } else {
            Cause::Transport(err.to_string())
        }
    }
}

impl Display for Cause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Cause::Status { status, body } if body.is_empty() => write!(f, "HTTP {}", status),
            Cause::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            Cause::Transport(msg) => write!(f, "transport error: {}", msg),
            Cause::Timeout { after_ms } => write!(f, "timed out after {}ms", after_ms),
            Cause::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(BODY_EXCERPT_MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("upsert_failed: email={} cause={cause}", payload.email)]
    UpsertFailed { payload: UpsertPayload, cause: Cause },
    #[error("not_found: email={email} cause={cause}")]
    NotFound { email: String, cause: Cause },
    #[error("lookup_failed: email={email} cause={cause}")]
    LookupFailed { email: String, cause: Cause },
    #[error("login_failed: email={email} cause={cause}")]
    LoginFailed { email: String, cause: Cause },
}

impl SyncError {
    pub fn upsert(payload: &UpsertPayload, cause: Cause) -> Self {
        SyncError::UpsertFailed { payload: payload.clone(), cause }
    }
    pub fn not_found<S: Into<String>>(email: S) -> Self {
        SyncError::NotFound { email: email.into(), cause: Cause::status(404, "") }
    }
    pub fn lookup<S: Into<String>>(email: S, cause: Cause) -> Self {
        SyncError::LookupFailed { email: email.into(), cause }
    }
    pub fn login<S: Into<String>>(email: S, cause: Cause) -> Self {
        SyncError::LoginFailed { email: email.into(), cause }
    }

    pub fn stage(&self) -> Stage {
        match self {
            SyncError::UpsertFailed { .. } => Stage::Upsert,
            SyncError::NotFound { .. } | SyncError::LookupFailed { .. } => Stage::Lookup,
            SyncError::LoginFailed { .. } => Stage::Login,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            SyncError::UpsertFailed { payload, .. } => payload.email.as_str(),
            SyncError::NotFound { email, .. }
            | SyncError::LookupFailed { email, .. }
            | SyncError::LoginFailed { email, .. } => email.as_str(),
        }
    }

    pub fn cause(&self) -> &Cause {
        match self {
            SyncError::UpsertFailed { cause, .. }
            | SyncError::NotFound { cause, .. }
            | SyncError::LookupFailed { cause, .. }
            | SyncError::LoginFailed { cause, .. } => cause,
        }
    }

    pub fn code_str(&self) -> &'static str {
        match self {
            SyncError::UpsertFailed { .. } => "upsert_failed",
            SyncError::NotFound { .. } => "not_found",
            SyncError::LookupFailed { .. } => "lookup_failed",
            SyncError::LoginFailed { .. } => "login_failed",
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(email: &str) -> UpsertPayload {
        UpsertPayload {
            email: email.into(),
            name: String::new(),
            role: "user".into(),
            external_id: "ext_1".into(),
        }
    }

    #[test]
    fn stage_mapping() {
        assert_eq!(SyncError::upsert(&payload("a@x.com"), Cause::status(500, "")).stage(), Stage::Upsert);
        assert_eq!(SyncError::not_found("a@x.com").stage(), Stage::Lookup);
        assert_eq!(SyncError::lookup("a@x.com", Cause::Transport("reset".into())).stage(), Stage::Lookup);
        assert_eq!(SyncError::login("a@x.com", Cause::status(401, "")).stage(), Stage::Login);
    }

    #[test]
    fn display_carries_email_and_status() {
        let err = SyncError::upsert(&payload("b@x.com"), Cause::status(500, "boom"));
        let text = err.to_string();
        assert!(text.contains("b@x.com"), "{text}");
        assert!(text.contains("HTTP 500"), "{text}");
        assert_eq!(err.email(), "b@x.com");
        assert_eq!(err.cause().status_code(), Some(500));
        assert_eq!(err.code_str(), "upsert_failed");
    }

    #[test]
    fn not_found_is_a_404() {
        let err = SyncError::not_found("c@x.com");
        assert_eq!(err.cause().status_code(), Some(404));
        assert!(!err.cause().is_transport());
    }

    #[test]
    fn long_bodies_are_cut() {
        let body = "x".repeat(1000);
        match Cause::status(502, &body) {
            Cause::Status { body, .. } => {
                assert!(body.ends_with("..."));
                assert_eq!(body.len(), BODY_EXCERPT_MAX + 3);
            }
            other => panic!("unexpected cause: {other:?}"),
        }
    }

    #[test]
    fn timeout_is_transport_class() {
        let cause = Cause::timeout(Duration::from_millis(1500));
        assert!(cause.is_transport());
        assert_eq!(cause.to_string(), "timed out after 1500ms");
    }
}
