//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling; one spawned task per
//! accepted connection, no shared mutable state across requests.

use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::cache::CacheClient;
use crate::config::Args;
use crate::defer::DeferClient;
use crate::orchestrator::Orchestrator;
use crate::routes;
use crate::types::PosologyError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Present only when both collaborator endpoints are configured.
    /// Without it every permutation query yields a server-error result.
    pub orchestrator: Option<Arc<Orchestrator>>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// Both the cache and the defer endpoint are required for the request
    /// pipeline; with either missing the service still starts (health
    /// probes must work) but answers every query with a server error.
    /// Failing to construct an HTTP client at all is a hard error.
    pub fn new(args: Args) -> Result<Self, PosologyError> {
        let orchestrator = match (&args.cache_url, &args.defer_url) {
            (Some(cache_url), Some(defer_url)) => {
                let cache = CacheClient::new(cache_url, args.request_timeout_ms)?;
                let defer = DeferClient::new(defer_url, args.request_timeout_ms)?;
                Some(Arc::new(Orchestrator::new(Arc::new(cache), Arc::new(defer))))
            }
            _ => {
                warn!(
                    cache_configured = args.cache_url.is_some(),
                    defer_configured = args.defer_url.is_some(),
                    "collaborator endpoints incomplete, permutation queries will fail"
                );
                None
            }
        };

        Ok(Self {
            args,
            orchestrator,
            started_at: Instant::now(),
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), PosologyError> {
    let listener = TcpListener::bind(state.args.listen)
        .await
        .map_err(|e| PosologyError::Configuration(format!("cannot bind {}: {}", state.args.listen, e)))?;

    info!(
        "Posology listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
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

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // The front door: permutation queries
        (Method::GET, "/permutations") => {
            routes::handle_permutations(Arc::clone(&state), query.as_deref()).await
        }

        // Liveness probe - returns 200 if the service is running
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Readiness probe - returns 200 only with both collaborators configured
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        // Not found
        _ => not_found_response(&path),
    };

    Ok(response)
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "success": false,
        "message": format!("no route for {}", path),
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn args(cache: Option<&str>, defer: Option<&str>) -> Args {
        Args {
            node_id: Uuid::new_v4(),
            listen: "127.0.0.1:0".parse().unwrap(),
            cache_url: cache.map(|s| s.to_string()),
            defer_url: defer.map(|s| s.to_string()),
            log_level: "info".to_string(),
            request_timeout_ms: 1000,
        }
    }

    #[test]
    fn test_state_without_endpoints_has_no_orchestrator() {
        let state = AppState::new(args(None, None)).unwrap();
        assert!(state.orchestrator.is_none());
    }

    #[test]
    fn test_state_with_partial_endpoints_has_no_orchestrator() {
        let state = AppState::new(args(Some("http://cache"), None)).unwrap();
        assert!(state.orchestrator.is_none());

        let state = AppState::new(args(None, Some("http://defer"))).unwrap();
        assert!(state.orchestrator.is_none());
    }

    #[test]
    fn test_state_with_both_endpoints_is_ready() {
        let state = AppState::new(args(Some("http://cache"), Some("http://defer"))).unwrap();
        assert!(state.orchestrator.is_some());
    }
}
