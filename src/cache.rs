//! Cache service client
//!
//! Read/write adapter for the external permutation cache, keyed by pill
//! count. The cache is a best-effort side channel, not a source of truth:
//! results are deterministic, so concurrent duplicate writes for the same
//! key are harmless no-ops after the first.
//!
//! Wire format:
//! - `GET <base>?pills=N` -> JSON object, optionally carrying `permutations`
//! - `POST <base>` with JSON `{pills, permutations}` -> success status
//!
//! A well-formed read response without a `permutations` field is a miss,
//! not an error. Presence is carried as `Option<u64>` so a legitimately
//! stored value is never conflated with "not found".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{PosologyError, Result};

/// A cached (pills, permutations) pair, as stored by the cache service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub pills: u32,
    pub permutations: u64,
}

/// Read-side payload; `permutations` absent means cache miss
#[derive(Debug, Deserialize)]
struct CacheReadBody {
    permutations: Option<u64>,
}

/// Seam for the external permutation cache, mockable in tests
#[async_trait]
pub trait PermutationCache: Send + Sync {
    /// Look up the stored count for `pills`. `Ok(None)` is a miss.
    async fn read(&self, pills: u32) -> Result<Option<u64>>;

    /// Store a computed count. Best effort; callers decide whether
    /// failure matters.
    async fn write(&self, pills: u32, permutations: u64) -> Result<()>;
}

/// HTTP client for the cache service
pub struct CacheClient {
    http: reqwest::Client,
    base_url: String,
}

impl CacheClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| {
                PosologyError::Configuration(format!("cannot build cache HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PermutationCache for CacheClient {
    async fn read(&self, pills: u32) -> Result<Option<u64>> {
        let url = format!("{}?pills={}", self.base_url, pills);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PosologyError::Retrieval(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PosologyError::Retrieval(format!(
                "cache service returned {} for pills={}",
                status, pills
            )));
        }

        let body: CacheReadBody = response
            .json()
            .await
            .map_err(|e| PosologyError::Retrieval(format!("malformed cache payload: {}", e)))?;

        Ok(body.permutations)
    }

    async fn write(&self, pills: u32, permutations: u64) -> Result<()> {
        let entry = CacheEntry { pills, permutations };

        let response = self
            .http
            .post(&self.base_url)
            .json(&entry)
            .send()
            .await
            .map_err(|e| PosologyError::Persistence(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PosologyError::Persistence(format!(
                "cache service returned {} writing pills={}",
                status, pills
            )));
        }

        Ok(())
    }
}
