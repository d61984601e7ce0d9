use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::{SyncError, SyncResult};
use crate::identity::{BackendUserRecord, UpsertPayload};

use super::{read_json, status_cause, BackendHttp, UserUpsert};

pub struct UpsertClient {
    http: BackendHttp,
}

impl UpsertClient {
    pub fn new(http: BackendHttp) -> Self { Self { http } }
}

#[async_trait]
impl UserUpsert for UpsertClient {
    #[instrument(skip(self, payload), fields(email = %payload.email, external_id = %payload.external_id))]
    async fn upsert(&self, payload: &UpsertPayload) -> SyncResult<BackendUserRecord> {
        let url = self.http.endpoint("api/users").map_err(|c| SyncError::upsert(payload, c))?;
        let resp = self.http.client()
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| SyncError::upsert(payload, e.into()))?;
        if !resp.status().is_success() {
            return Err(SyncError::upsert(payload, status_cause(resp).await));
        }
        let record: BackendUserRecord = read_json(resp).await.map_err(|c| SyncError::upsert(payload, c))?;
        debug!(id = ?record.id, "user upserted");
        Ok(record)
    }
}
