//! Error types for the tiered cache

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the tiered cache
///
/// Once a manager is constructed, only [`Error::InvalidPattern`] reaches its
/// callers. Disk tier failures are logged and downgraded to misses.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (unknown memory policy, zero capacity, bad file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Malformed glob pattern
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl Error {
    /// Returns true for failures the disk tier recovers from locally
    pub fn is_tier_failure(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Serialization(_))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("unknown memory policy: arc".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown memory policy: arc"
        );

        let err = Error::InvalidPattern {
            pattern: "user:[".to_string(),
            reason: "unclosed bracket".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid pattern 'user:[': unclosed bracket"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_tier_failure());
    }

    #[test]
    fn test_tier_failure_classification() {
        assert!(Error::Serialization("truncated".into()).is_tier_failure());
        assert!(!Error::Config("bad".into()).is_tier_failure());
    }
}
