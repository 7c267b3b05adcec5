//! HTTP routes for the posology service

pub mod health;
pub mod permutations;

pub use health::{health_check, readiness_check, version_info};
pub use permutations::handle_permutations;
