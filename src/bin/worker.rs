//! Posology Worker - deferred-compute backend for large pill counts
//!
//! Run this binary behind the defer endpoint configured on the gateway.
//! It accepts the gateway's task submissions, computes the permutation
//! count, and publishes the result to the cache service.
//!
//! Usage:
//!   posology-worker --listen 0.0.0.0:8091 --cache-url http://cache:8090/permutations
//!
//! Environment variables:
//!   LISTEN - Address to listen on (default: 0.0.0.0:8091)
//!   CACHE_URL - Cache service base URL (results are only logged without it)
//!   REQUEST_TIMEOUT_MS - Cache request timeout in milliseconds (default: 30000)

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use posology::worker::{Worker, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "posology-worker")]
#[command(about = "Deferred-compute worker for the posology gateway")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8091")]
    listen: SocketAddr,

    /// Cache service base URL for publishing results
    #[arg(long, env = "CACHE_URL")]
    cache_url: Option<String>,

    /// Cache request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    request_timeout_ms: u64,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,posology=debug")
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse arguments
    let args = Args::parse();

    let config = WorkerConfig {
        listen: args.listen,
        cache_url: args.cache_url,
        request_timeout_ms: args.request_timeout_ms,
    };

    info!("Starting posology worker on {}", config.listen);

    let worker = match Worker::new(config) {
        Ok(worker) => Arc::new(worker),
        Err(e) => {
            error!("Failed to create worker: {}", e);
            std::process::exit(1);
        }
    };

    // Handle shutdown signals
    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker.run().await {
            error!("Worker error: {}", e);
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = worker_handle => {
            if let Err(e) = result {
                error!("Worker task error: {}", e);
            }
        }
    }

    info!("Worker shutting down");
}
