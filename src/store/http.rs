use async_trait::async_trait;
use serde_json::json;
use serde_json::Value;

use super::GraphStore;
use crate::config::StoreConfig;
use crate::Result;
use crate::VerifyError;

/// Transactional-HTTP adapter for the graph store.
///
/// Statements are POSTed one at a time in the store's commit envelope
/// (`{"statements": [{"statement": ...}]}`) and rows are lifted out of the
/// `results[0].data[*].row` shape of the reply.
pub struct HttpGraphStore {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGraphStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(VerifyError::StoreTransport)?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub(crate) fn rows_from_reply(reply: &Value) -> Result<Vec<Value>> {
        if let Some(errors) = reply.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                return Err(VerifyError::StoreResponse(errors[0].to_string()).into());
            }
        }
        let results = reply
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| VerifyError::StoreResponse("reply carries no results".to_string()))?;
        let Some(first) = results.first() else {
            return Ok(Vec::new());
        };
        let data = first
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| VerifyError::StoreResponse("result carries no data".to_string()))?;
        Ok(data
            .iter()
            .map(|entry| entry.get("row").cloned().unwrap_or_else(|| entry.clone()))
            .collect())
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn query(
        &self,
        statement: &str,
    ) -> Result<Vec<Value>> {
        let body = json!({ "statements": [{ "statement": statement }] });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(VerifyError::StoreTransport)?
            .error_for_status()
            .map_err(VerifyError::StoreTransport)?;
        let reply: Value = response.json().await.map_err(VerifyError::StoreTransport)?;
        Self::rows_from_reply(&reply)
    }
}
