//! Unified error types for bfguard.
//!
//! Failures in the shim are contained locally: nothing here should ever
//! surface as a panic of the hosting page. The variants exist so that
//! callers can log and degrade, not so they can crash.

/// Unified error types for the bfguard crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty cookie name).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A platform capability is unavailable in this environment.
    ///
    /// Callers degrade to reduced protection rather than failing the
    /// page load.
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// The cross-tab eviction topic is closed or was never created.
    #[error("eviction topic unavailable: {0}")]
    TopicUnavailable(String),

    /// A URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CapabilityUnavailable("sessionStorage".to_string());
        assert!(err.to_string().contains("capability unavailable"));
        assert!(err.to_string().contains("sessionStorage"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
