//! Error taxonomy for the posology service
//!
//! Mirrors the failure classes of the request pipeline: bad input, cache
//! read/write trouble, defer submission trouble, and missing collaborator
//! configuration. Cache errors are recoverable on the request path (a read
//! failure falls through to computation, a write failure is only logged);
//! submission and configuration errors are terminal for their request.

use thiserror::Error;

/// Service-wide error type
#[derive(Debug, Error)]
pub enum PosologyError {
    /// Bad, missing, or out-of-range caller input
    #[error("invalid request: {0}")]
    Validation(String),

    /// Cache read failed (transport, bad status, or malformed payload)
    #[error("cache read failed: {0}")]
    Retrieval(String),

    /// Cache write failed (transport or bad status)
    #[error("cache write failed: {0}")]
    Persistence(String),

    /// Defer submission failed (transport or bad status)
    #[error("defer submission failed: {0}")]
    Submission(String),

    /// Required collaborator endpoint is not configured
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PosologyError {
    /// HTTP status class for this error when it reaches the caller.
    /// Validation is the caller's fault; everything else is ours.
    pub fn status_code(&self) -> u16 {
        match self {
            PosologyError::Validation(_) => 400,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, PosologyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PosologyError::Validation("x".into()).status_code(), 400);
        assert_eq!(PosologyError::Retrieval("x".into()).status_code(), 500);
        assert_eq!(PosologyError::Submission("x".into()).status_code(), 500);
        assert_eq!(PosologyError::Configuration("x".into()).status_code(), 500);
    }
}
