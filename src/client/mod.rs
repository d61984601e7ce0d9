//! HTTP clients for the backend REST surface, one per pipeline stage.
//!
//! The traits are the seams the orchestrator depends on; the structs are the reqwest
//! implementations that speak the backend contract:
//! - `POST /api/users` (upsert)
//! - `GET /api/users/by-email/:email` (lookup)
//! - `POST /api/auth/login/:provider` (session)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::config::SyncConfig;
use crate::error::{Cause, SyncResult};
use crate::identity::{BackendUserRecord, UpsertPayload};
use crate::session::SessionCredential;

mod login;
mod lookup;
mod upsert;

pub use login::SessionClient;
pub use lookup::LookupClient;
pub use upsert::UpsertClient;

#[async_trait]
pub trait UserUpsert: Send + Sync {
    /// Insert or refresh the user keyed by `payload.external_id`. Repeating a call is safe.
    async fn upsert(&self, payload: &UpsertPayload) -> SyncResult<BackendUserRecord>;
}

#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_email(&self, email: &str) -> SyncResult<BackendUserRecord>;
}

#[async_trait]
pub trait SessionLogin: Send + Sync {
    /// Exchange an already-verified email for a session credential. Does not store it.
    async fn login(&self, email: &str) -> SyncResult<SessionCredential>;
    /// Hand a credential to the session store. Only called for runs that are still current.
    fn install(&self, credential: SessionCredential);
}

/// Shared reqwest client and base URL for all three stage clients.
#[derive(Clone)]
pub struct BackendHttp {
    base: Url,
    client: reqwest::Client,
}

impl BackendHttp {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        // No cookie jar; issued credentials are held by the SessionStore only
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::with_client(config.backend_url.clone(), client))
    }

    pub fn with_client(mut base: Url, client: reqwest::Client) -> Self {
        // Relative joins only keep a path prefix when the base ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base, client }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Cause> {
        self.base
            .join(path)
            .map_err(|e| Cause::Transport(format!("invalid endpoint '{}': {}", path, e)))
    }
}

/// Read a success body as JSON; decoding problems are `Cause::Malformed`.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Cause> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| Cause::Malformed(e.to_string()))
}

/// Body excerpt for a failed status; an unreadable body is reported as empty.
pub(crate) async fn status_cause(resp: reqwest::Response) -> Cause {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Cause::status(status, &body)
}
