use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::SET_COOKIE;
use tracing::{debug, instrument};

use crate::error::{Cause, SyncError, SyncResult};
use crate::session::{parse_set_cookie, SessionCredential, SessionStore};

use super::{status_cause, BackendHttp, SessionLogin};

/// Session establishment against `POST /api/auth/login/:provider`.
///
/// Performs no identity verification of its own: the email is trusted because the
/// identity provider vouched for it and the earlier stages found it in the backend.
pub struct SessionClient {
    http: BackendHttp,
    provider: String,
    store: Arc<dyn SessionStore>,
}

impl SessionClient {
    pub fn new<S: Into<String>>(http: BackendHttp, provider: S, store: Arc<dyn SessionStore>) -> Self {
        Self { http, provider: provider.into(), store }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }
}

#[async_trait]
impl SessionLogin for SessionClient {
    #[instrument(skip(self))]
    async fn login(&self, email: &str) -> SyncResult<SessionCredential> {
        let path = format!("api/auth/login/{}", urlencoding::encode(&self.provider));
        let url = self.http.endpoint(&path).map_err(|c| SyncError::login(email, c))?;
        let resp = self.http.client()
            .post(url)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .map_err(|e| SyncError::login(email, e.into()))?;
        if !resp.status().is_success() {
            return Err(SyncError::login(email, status_cause(resp).await));
        }
        let cookies: Vec<_> = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect();
        if cookies.is_empty() {
            return Err(SyncError::login(email, Cause::Malformed("no session cookie issued".into())));
        }
        // Confirmation body is informational; the cookie is the credential.
        let confirmation: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        let credential = SessionCredential::from_cookies(email, &cookies, confirmation);
        debug!(provider = %self.provider, cookies = cookies.len(), expires_at = ?credential.expires_at, "session issued");
        Ok(credential)
    }

    fn install(&self, credential: SessionCredential) {
        self.store.put(credential);
    }
}
