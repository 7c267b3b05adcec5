//! HTTP server for the posology service

pub mod http;

pub use http::{run, AppState};
