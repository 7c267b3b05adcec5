//! Request orchestrator
//!
//! The policy state machine for a single request:
//! validated -> cache-check -> {served-from-cache | computing | deferring}
//! -> responded.
//!
//! A cache outage must never block an answer: read failures are logged and
//! the request falls through to the compute/defer decision. The
//! post-compute cache write is fire-and-forget on the runtime; the caller's
//! latency is pure computation time, never computation plus persistence.
//! Defer failures, by contrast, surface to the caller, since deferral is
//! the only path to an answer for large pill counts.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::PermutationCache;
use crate::defer::{DeferQueue, DeferredTask};
use crate::engine::{self, MAX_PILLS, SYNC_THRESHOLD};
use crate::types::{PosologyError, Result};

/// Terminal result of the policy state machine
#[derive(Debug)]
pub enum Outcome {
    /// The count is known now (cache hit or inline computation)
    Complete { permutations: u64 },
    /// The count will be produced by the deferred worker
    Deferred { task: DeferredTask },
}

/// Sequences cache, engine, and defer calls for each request
pub struct Orchestrator {
    cache: Arc<dyn PermutationCache>,
    defer: Arc<dyn DeferQueue>,
}

impl Orchestrator {
    pub fn new(cache: Arc<dyn PermutationCache>, defer: Arc<dyn DeferQueue>) -> Self {
        Self { cache, defer }
    }

    /// Run the full policy for a pill count.
    ///
    /// Out-of-range input fails validation before any collaborator is
    /// touched. Integrality is enforced upstream by query parsing.
    pub async fn handle(&self, pills: u32) -> Result<Outcome> {
        if !(1..=MAX_PILLS).contains(&pills) {
            return Err(PosologyError::Validation(format!(
                "pills must be between 1 and {}, got {}",
                MAX_PILLS, pills
            )));
        }

        match self.cache.read(pills).await {
            Ok(Some(permutations)) => {
                debug!(pills, permutations, "cache hit");
                return Ok(Outcome::Complete { permutations });
            }
            Ok(None) => {
                debug!(pills, "cache miss");
            }
            Err(e) => {
                // Non-fatal: fall through to the compute/defer decision.
                warn!(error = %e, pills, "cache read failed, continuing without it");
            }
        }

        if pills <= SYNC_THRESHOLD {
            let permutations = engine::count(pills);
            info!(pills, permutations, "computed inline");
            self.spawn_write_back(pills, permutations);
            Ok(Outcome::Complete { permutations })
        } else {
            let task = self.defer.submit(pills).await?;
            info!(pills, task_id = %task.id, "handed off to deferred worker");
            Ok(Outcome::Deferred { task })
        }
    }

    /// Detach the cache write so persistence latency never reaches the
    /// caller. The task lives on the runtime; its outcome is only logged.
    fn spawn_write_back(&self, pills: u32, permutations: u64) {
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            match cache.write(pills, permutations).await {
                Ok(()) => debug!(pills, "cache write-back succeeded"),
                Err(e) => warn!(error = %e, pills, "cache write-back failed"),
            }
        });
    }
}
