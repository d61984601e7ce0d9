use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use crate::error::{Cause, SyncError, SyncResult};
use crate::identity::BackendUserRecord;

use super::{read_json, status_cause, BackendHttp, UserLookup};

pub struct LookupClient {
    http: BackendHttp,
}

impl LookupClient {
    pub fn new(http: BackendHttp) -> Self { Self { http } }
}

#[async_trait]
impl UserLookup for LookupClient {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> SyncResult<BackendUserRecord> {
        let path = format!("api/users/by-email/{}", urlencoding::encode(email));
        let url = self.http.endpoint(&path).map_err(|c| SyncError::lookup(email, c))?;
        let resp = self.http.client()
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::lookup(email, e.into()))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SyncError::not_found(email));
        }
        if !status.is_success() {
            return Err(SyncError::lookup(email, status_cause(resp).await));
        }
        let record: BackendUserRecord = read_json(resp).await.map_err(|c| SyncError::lookup(email, c))?;
        if !record.matches_email(email) {
            return Err(SyncError::lookup(
                email,
                Cause::Malformed(format!("lookup returned a record for '{}'", record.email)),
            ));
        }
        debug!(id = ?record.id, "user resolved");
        Ok(record)
    }
}
