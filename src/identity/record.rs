use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backends disagree on whether ids are numeric or opaque strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

/// User record as returned by the backend. Only `email` is guaranteed by the contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackendUserRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<RecordId>,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl BackendUserRecord {
    /// Emails are compared case-insensitively; backends commonly lowercase on write.
    pub fn matches_email(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}
