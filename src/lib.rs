//! Posology - pill-permutation counting service
//!
//! Answers one question: for N total pills, how many ordered sequences of
//! daily doses (each 1 or 2 units) sum exactly to N? Wrapped around that
//! pure computation is a request pipeline that serves from an external
//! cache when possible, computes inline for small N, and hands large N to
//! a deferred worker to stay under the hosting response-time ceiling.
//!
//! ## Components
//!
//! - **Engine**: the pure counting function
//! - **Cache client**: best-effort read/write against the cache service
//! - **Defer client**: job handoff to the deferred-compute worker
//! - **Orchestrator**: the per-request cache/compute/defer policy
//! - **Worker**: the deferred-compute backend (second binary)

pub mod cache;
pub mod config;
pub mod defer;
pub mod engine;
pub mod orchestrator;
pub mod routes;
pub mod server;
pub mod types;
pub mod worker;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{PosologyError, Result};
