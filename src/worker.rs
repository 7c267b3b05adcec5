//! Deferred-compute worker
//!
//! Backend processor for permutation jobs too large for the gateway's
//! synchronous path. The gateway's defer client POSTs `{id, pills}` here;
//! the worker computes the count (same engine, no threshold) and publishes
//! the result through the cache service, so the next query for that pill
//! count is a cache hit. The worker keeps no task state beyond the log
//! line carrying the task id.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::cache::{CacheClient, PermutationCache};
use crate::engine::{self, MAX_PILLS};
use crate::types::PosologyError;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub listen: SocketAddr,
    pub cache_url: Option<String>,
    pub request_timeout_ms: u64,
}

/// Task payload as submitted by the gateway's defer client
#[derive(Debug, Deserialize)]
struct TaskSubmission {
    id: String,
    pills: u32,
}

/// Deferred-compute worker service
pub struct Worker {
    cache: Option<Arc<dyn PermutationCache>>,
    listen: SocketAddr,
}

impl Worker {
    pub fn new(config: WorkerConfig) -> Result<Self, PosologyError> {
        let cache = match config.cache_url.as_deref() {
            Some(url) => Some(
                Arc::new(CacheClient::new(url, config.request_timeout_ms)?)
                    as Arc<dyn PermutationCache>,
            ),
            None => {
                warn!("no CACHE_URL configured, computed results will only be logged");
                None
            }
        };

        Ok(Self { cache, listen: config.listen })
    }

    #[cfg(test)]
    fn with_cache(cache: Arc<dyn PermutationCache>, listen: SocketAddr) -> Self {
        Self { cache: Some(cache), listen }
    }

    /// Accept loop
    pub async fn run(self: Arc<Self>) -> Result<(), PosologyError> {
        let listener = TcpListener::bind(self.listen)
            .await
            .map_err(|e| PosologyError::Configuration(format!("cannot bind {}: {}", self.listen, e)))?;

        info!("Posology worker listening on {}", self.listen);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let worker = Arc::clone(&self);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            let worker = Arc::clone(&worker);
                            async move { worker.handle_request(req).await }
                        });

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            error!("Error serving connection from {}: {:?}", addr, err);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {:?}", e);
                }
            }
        }
    }

    async fn handle_request(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = match (method, path.as_str()) {
            (Method::POST, "/tasks") => {
                let body = req.collect().await?.to_bytes();
                self.process_submission(&body).await
            }
            (Method::GET, "/health") | (Method::GET, "/healthz") => Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .body(Full::new(Bytes::from(r#"{"healthy":true}"#)))
                .unwrap(),
            _ => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .header("Content-Type", "application/json")
                .body(Full::new(Bytes::from(r#"{"success":false,"message":"not found"}"#)))
                .unwrap(),
        };

        Ok(response)
    }

    /// Parse, compute, and publish one submitted task
    async fn process_submission(&self, body: &[u8]) -> Response<Full<Bytes>> {
        let task: TaskSubmission = match serde_json::from_slice(body) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "rejected malformed task submission");
                return error_response(StatusCode::BAD_REQUEST, "malformed task payload");
            }
        };

        if !(1..=MAX_PILLS).contains(&task.pills) {
            warn!(task_id = %task.id, pills = task.pills, "rejected out-of-range task");
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("pills must be between 1 and {}", MAX_PILLS),
            );
        }

        let permutations = engine::count(task.pills);
        info!(task_id = %task.id, pills = task.pills, permutations, "deferred computation complete");

        // Best effort, same as the gateway's write-back: the cache is the
        // only place the result lands, but there is no retry protocol.
        if let Some(ref cache) = self.cache {
            if let Err(e) = cache.write(task.pills, permutations).await {
                warn!(error = %e, task_id = %task.id, "failed to publish deferred result");
            }
        }

        Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "success": false, "message": message });
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingCache {
        writes: AtomicUsize,
        last: Mutex<Option<(u32, u64)>>,
        fail: bool,
    }

    impl RecordingCache {
        fn new(fail: bool) -> Self {
            Self { writes: AtomicUsize::new(0), last: Mutex::new(None), fail }
        }
    }

    #[async_trait::async_trait]
    impl PermutationCache for RecordingCache {
        async fn read(&self, _pills: u32) -> Result<Option<u64>> {
            Ok(None)
        }

        async fn write(&self, pills: u32, permutations: u64) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((pills, permutations));
            if self.fail {
                return Err(PosologyError::Persistence("cache unreachable".into()));
            }
            Ok(())
        }
    }

    fn worker(cache: Arc<RecordingCache>) -> Worker {
        Worker::with_cache(cache, "127.0.0.1:0".parse().unwrap())
    }

    #[tokio::test]
    async fn test_valid_task_computes_and_publishes() {
        let cache = Arc::new(RecordingCache::new(false));
        let w = worker(Arc::clone(&cache));

        let resp = w
            .process_submission(br#"{"id":"abc","pills":44}"#)
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(cache.writes.load(Ordering::SeqCst), 1);
        assert_eq!(*cache.last.lock().unwrap(), Some((44, 1_134_903_170)));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_rejected() {
        let cache = Arc::new(RecordingCache::new(false));
        let w = worker(Arc::clone(&cache));

        for body in [
            &b"not json"[..],
            &br#"{"id":"abc"}"#[..],
            &br#"{"pills":"x","id":"abc"}"#[..],
        ] {
            let resp = w.process_submission(body).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(cache.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_task_is_rejected() {
        let cache = Arc::new(RecordingCache::new(false));
        let w = worker(Arc::clone(&cache));

        let resp = w.process_submission(br#"{"id":"abc","pills":48}"#).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = w.process_submission(br#"{"id":"abc","pills":0}"#).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(cache.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_is_swallowed() {
        // One best-effort attempt; the submitter gets 204 either way.
        let cache = Arc::new(RecordingCache::new(true));
        let w = worker(Arc::clone(&cache));

        let resp = w.process_submission(br#"{"id":"abc","pills":10}"#).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(cache.writes.load(Ordering::SeqCst), 1);
    }
}
