//! Permutation query route
//!
//! The front door: `GET /permutations?pills=N`.
//!
//! Responses:
//! - 200 `{"success":true,"status":"complete","permutations":<count>}`
//! - 202 `{"success":true,"status":"deferred","task":{"id":"...","url":"..."}}`
//! - 400 `{"success":false,"message":"..."}` for bad input
//! - 500 `{"success":false,"message":"..."}` for missing configuration or
//!   defer failure
//!
//! Validation failures get a descriptive message; internal failures get a
//! generic one, with the detail logged rather than echoed to the caller.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

use crate::defer::DeferredTask;
use crate::engine::MAX_PILLS;
use crate::orchestrator::Outcome;
use crate::server::AppState;
use crate::types::PosologyError;

/// Successful inline or cached result
#[derive(Debug, Serialize)]
struct CompleteBody {
    success: bool,
    status: &'static str,
    permutations: u64,
}

/// Result handed off to the deferred worker
#[derive(Debug, Serialize)]
struct DeferredBody {
    success: bool,
    status: &'static str,
    task: DeferredTask,
}

/// Structured failure envelope
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

/// Handle `GET /permutations?pills=N`
pub async fn handle_permutations(state: Arc<AppState>, query: Option<&str>) -> Response<Full<Bytes>> {
    let pills = match parse_pills(query) {
        Ok(pills) => pills,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
    };

    let orchestrator = match &state.orchestrator {
        Some(orch) => orch,
        None => {
            error!(pills, "request rejected: cache/defer endpoints not configured");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "service is not configured to answer permutation queries",
            );
        }
    };

    match orchestrator.handle(pills).await {
        Ok(Outcome::Complete { permutations }) => json_response(
            StatusCode::OK,
            &CompleteBody { success: true, status: "complete", permutations },
        ),
        Ok(Outcome::Deferred { task }) => json_response(
            StatusCode::ACCEPTED,
            &DeferredBody { success: true, status: "deferred", task },
        ),
        Err(PosologyError::Validation(message)) => {
            // Caller's fault; the detail is safe and useful to echo.
            error_response(StatusCode::BAD_REQUEST, &message)
        }
        Err(e) => {
            warn!(error = %e, pills, "permutation request failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to process permutation request",
            )
        }
    }
}

/// Extract and validate the `pills` query parameter.
///
/// Integrality is enforced here: anything that does not parse as a plain
/// base-10 integer ("x", "1.5", "") is rejected before range checks run.
/// The value is taken verbatim, with no percent-decoding: the contract is
/// a plain integer, so an encoded form like `%34%34` is rejected the same
/// way any other non-digit input is.
fn parse_pills(query: Option<&str>) -> Result<u32, String> {
    let query = query.unwrap_or("");

    let raw = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "pills")
        .map(|(_, value)| value)
        .ok_or_else(|| "missing required query parameter 'pills'".to_string())?;

    let pills: u32 = raw
        .parse()
        .map_err(|_| format!("'pills' must be an integer, got '{}'", raw))?;

    if !(1..=MAX_PILLS).contains(&pills) {
        return Err(format!("'pills' must be between 1 and {}, got {}", MAX_PILLS, pills));
    }

    Ok(pills)
}

/// Serialize a body into a JSON response with permissive CORS headers
fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body)
        .unwrap_or_else(|_| r#"{"success":false,"message":"serialization failed"}"#.to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// Structured error envelope
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &ErrorBody { success: false, message: message.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use http_body_util::BodyExt;
    use uuid::Uuid;

    #[test]
    fn test_parse_valid_pills() {
        assert_eq!(parse_pills(Some("pills=5")), Ok(5));
        assert_eq!(parse_pills(Some("pills=47")), Ok(47));
        assert_eq!(parse_pills(Some("other=1&pills=43")), Ok(43));
    }

    #[test]
    fn test_parse_rejects_missing_parameter() {
        assert!(parse_pills(None).is_err());
        assert!(parse_pills(Some("")).is_err());
        assert!(parse_pills(Some("dose=5")).is_err());
    }

    #[test]
    fn test_parse_rejects_non_integers() {
        assert!(parse_pills(Some("pills=x")).is_err());
        assert!(parse_pills(Some("pills=1.5")).is_err());
        assert!(parse_pills(Some("pills=")).is_err());
        assert!(parse_pills(Some("pills=-3")).is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert!(parse_pills(Some("pills=0")).is_err());
        assert!(parse_pills(Some("pills=48")).is_err());
    }

    #[test]
    fn test_parse_takes_value_verbatim_without_decoding() {
        // Percent-encoded digits are not decoded; the contract is a plain
        // integer in the query string.
        assert!(parse_pills(Some("pills=%34%34")).is_err());
    }

    #[tokio::test]
    async fn test_missing_configuration_yields_server_error_for_any_n() {
        let args = Args {
            node_id: Uuid::new_v4(),
            listen: "127.0.0.1:0".parse().unwrap(),
            cache_url: None,
            defer_url: None,
            log_level: "info".to_string(),
            request_timeout_ms: 1000,
        };
        let state = Arc::new(AppState::new(args).unwrap());

        // Both the synchronous and the deferred range fail the same way.
        for query in [Some("pills=5"), Some("pills=44")] {
            let response = handle_permutations(Arc::clone(&state), query).await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["success"], false);
            assert!(json["message"].as_str().is_some_and(|m| !m.is_empty()));
        }
    }

    #[tokio::test]
    async fn test_bad_input_rejected_before_configuration_check() {
        // Validation runs first, so an unconfigured instance still answers
        // bad input with 400, not 500.
        let args = Args {
            node_id: Uuid::new_v4(),
            listen: "127.0.0.1:0".parse().unwrap(),
            cache_url: None,
            defer_url: None,
            log_level: "info".to_string(),
            request_timeout_ms: 1000,
        };
        let state = Arc::new(AppState::new(args).unwrap());

        let response = handle_permutations(state, Some("pills=x")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_complete_envelope_shape() {
        let body = CompleteBody { success: true, status: "complete", permutations: 8 };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["status"], "complete");
        assert_eq!(json["permutations"], 8);
    }

    #[test]
    fn test_deferred_envelope_shape() {
        let body = DeferredBody {
            success: true,
            status: "deferred",
            task: DeferredTask {
                id: "abc".to_string(),
                url: "http://defer.internal/tasks/abc".to_string(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "deferred");
        assert_eq!(json["task"]["id"], "abc");
        assert_eq!(json["task"]["url"], "http://defer.internal/tasks/abc");
    }

    #[test]
    fn test_error_envelope_shape() {
        let body = ErrorBody { success: false, message: "bad".to_string() };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "bad");
    }
}
