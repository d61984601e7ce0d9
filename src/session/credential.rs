use chrono::{DateTime, Utc};

use super::cookie::SetCookie;

/// Cookie-based session issued by `POST /api/auth/login/:provider`, scoped to one email.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCredential {
    pub email: String,
    /// `Cookie` header value: every issued `name=value` pair joined with `; `.
    pub cookie_header: String,
    pub issued_at: DateTime<Utc>,
    /// Earliest expiry among the issued cookies; None means a browser-session cookie.
    pub expires_at: Option<DateTime<Utc>>,
    /// JSON confirmation body, `Null` when the backend sent none.
    pub confirmation: serde_json::Value,
}

impl SessionCredential {
    pub fn from_cookies(email: &str, cookies: &[SetCookie], confirmation: serde_json::Value) -> Self {
        let now = Utc::now();
        let cookie_header = cookies.iter().map(SetCookie::pair).collect::<Vec<_>>().join("; ");
        let expires_at = cookies.iter().filter_map(|c| c.expires_at(now)).min();
        Self { email: email.to_string(), cookie_header, issued_at: now, expires_at, confirmation }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}
