//! Configuration for the posology service
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Posology - pill-permutation counting service
#[derive(Parser, Debug, Clone)]
#[command(name = "posology")]
#[command(about = "Counts 1/2-unit dose schedules with cache and deferred compute")]
pub struct Args {
    /// Unique node identifier for this service instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Base URL of the cache service (e.g. "http://cache:8090/permutations")
    ///
    /// If unset, every request that needs the cache or defer path yields a
    /// server-error result; the process still starts so health probes work.
    #[arg(long, env = "CACHE_URL")]
    pub cache_url: Option<String>,

    /// Base URL of the defer service (e.g. "http://defer:8091/tasks")
    #[arg(long, env = "DEFER_URL")]
    pub defer_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Collaborator request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,
}

impl Args {
    /// Validate configuration
    ///
    /// Missing collaborator URLs are deliberately NOT an error here: the
    /// service starts and reports them per-request, per the contract.
    pub fn validate(&self) -> Result<(), String> {
        for (name, url) in [("CACHE_URL", &self.cache_url), ("DEFER_URL", &self.defer_url)] {
            if let Some(u) = url {
                if !u.starts_with("http://") && !u.starts_with("https://") {
                    return Err(format!("{} must be an http(s) URL, got '{}'", name, u));
                }
            }
        }
        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be positive".to_string());
        }
        Ok(())
    }
}
