//! Defer service client
//!
//! Hands large-N jobs to the external deferred-compute worker and returns a
//! tracking descriptor. The task id is generated here, before the network
//! call: if the submission lands remotely but the confirmation is lost, the
//! id the caller sees still matches what the worker received. There is no
//! renegotiation beyond this single best-effort attempt.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::types::{PosologyError, Result};

/// Descriptor handed back to the caller for a deferred computation
#[derive(Debug, Clone, Serialize)]
pub struct DeferredTask {
    pub id: String,
    pub url: String,
}

/// Submission payload sent to the defer service
#[derive(Debug, Serialize)]
struct DeferSubmission<'a> {
    id: &'a str,
    pills: u32,
}

/// Seam for the external deferred worker, mockable in tests
#[async_trait]
pub trait DeferQueue: Send + Sync {
    /// Submit `pills` for asynchronous computation.
    async fn submit(&self, pills: u32) -> Result<DeferredTask>;
}

/// HTTP client for the defer service
pub struct DeferClient {
    http: reqwest::Client,
    base_url: String,
}

impl DeferClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| {
                PosologyError::Configuration(format!("cannot build defer HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Tracking URL for a task id under this defer endpoint
    fn task_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }
}

#[async_trait]
impl DeferQueue for DeferClient {
    async fn submit(&self, pills: u32) -> Result<DeferredTask> {
        // Id first, network second: the caller-visible id must match what
        // the worker received even if the confirmation never arrives.
        let id = Uuid::new_v4().to_string();

        let response = self
            .http
            .post(&self.base_url)
            .json(&DeferSubmission { id: &id, pills })
            .send()
            .await
            .map_err(|e| PosologyError::Submission(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PosologyError::Submission(format!(
                "defer service returned {} for pills={}",
                status, pills
            )));
        }

        let url = self.task_url(&id);
        Ok(DeferredTask { id, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_url_joins_base_and_id() {
        let client = DeferClient::new("http://defer.internal/tasks/", 1000)
            .expect("client construction should succeed");
        assert_eq!(client.task_url("abc"), "http://defer.internal/tasks/abc");
    }

    #[test]
    fn test_submission_wire_format() {
        let json = serde_json::to_value(DeferSubmission { id: "abc", pills: 44 }).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["pills"], 44);
    }

    #[test]
    fn test_task_descriptor_serializes_id_and_url() {
        let task = DeferredTask {
            id: "abc".to_string(),
            url: "http://defer.internal/tasks/abc".to_string(),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["url"], "http://defer.internal/tasks/abc");
    }
}
