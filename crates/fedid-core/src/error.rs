//! Error types for virtual identity store operations.
//!
//! Every fallible operation in the workspace returns the same tagged error
//! type so that callers can match on the kind without knowing which layer
//! produced the failure.

use thiserror::Error;

/// Main error type for identity store operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Caller supplied invalid input
    #[error("Invalid request: {0}")]
    Client(String),

    /// Store configuration is invalid or incomplete
    #[error("Configuration error: {0}")]
    Config(String),

    /// Domain lookup or domain-level mapping failure
    #[error("Domain error: {0}")]
    Domain(String),

    /// User does not exist
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Group does not exist
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// A backing store rejected a write
    #[error("Connector write failed: {0}")]
    ConnectorWrite(String),

    /// Internal failure surfaced to the caller after compensation
    #[error("Server error: {message}")]
    Server {
        /// What the store was doing when the failure occurred
        message: String,
        /// The underlying failure, when one exists
        #[source]
        cause: Option<Box<Error>>,
    },

    /// Authentication failed.
    ///
    /// Internal failures along the authentication path are collapsed into
    /// this kind so the caller cannot tell whether the claim matched, the
    /// user existed, or the credential mismatched.
    #[error("Authentication failure: {0}")]
    Authentication(String),
}

/// Specialized result type for identity store operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a server error without an underlying cause.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a server error wrapping the failure that triggered it.
    #[must_use]
    pub fn server_with_cause(message: impl Into<String>, cause: Error) -> Self {
        Self::Server {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Returns the error code for this error kind.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Client(_) => "CLIENT_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Domain(_) => "DOMAIN_ERROR",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::ConnectorWrite(_) => "CONNECTOR_WRITE",
            Self::Server { .. } => "SERVER_ERROR",
            Self::Authentication(_) => "AUTHENTICATION_FAILURE",
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::Server { .. } | Self::Config(_) | Self::ConnectorWrite(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::Client("test".to_string()).error_code(),
            "CLIENT_ERROR"
        );
        assert_eq!(
            Error::Config("test".to_string()).error_code(),
            "CONFIG_ERROR"
        );
        assert_eq!(
            Error::Domain("test".to_string()).error_code(),
            "DOMAIN_ERROR"
        );
        assert_eq!(
            Error::UserNotFound("test".to_string()).error_code(),
            "USER_NOT_FOUND"
        );
        assert_eq!(
            Error::GroupNotFound("test".to_string()).error_code(),
            "GROUP_NOT_FOUND"
        );
        assert_eq!(
            Error::ConnectorWrite("test".to_string()).error_code(),
            "CONNECTOR_WRITE"
        );
        assert_eq!(Error::server("test").error_code(), "SERVER_ERROR");
        assert_eq!(
            Error::Authentication("test".to_string()).error_code(),
            "AUTHENTICATION_FAILURE"
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::Config("No domains registered.".to_string());
        assert_eq!(err.to_string(), "Configuration error: No domains registered.");

        let err = Error::server("linkage commit failed");
        assert_eq!(err.to_string(), "Server error: linkage commit failed");
    }

    #[test]
    fn test_server_error_cause_chain() {
        use std::error::Error as _;

        let cause = Error::ConnectorWrite("duplicate entry".to_string());
        let err = Error::server_with_cause("failed to write user partition", cause.clone());

        let source = err.source().expect("server error should carry its cause");
        assert_eq!(source.to_string(), cause.to_string());
    }

    #[test]
    fn test_should_log() {
        assert!(Error::server("test").should_log());
        assert!(Error::Config("test".to_string()).should_log());
        assert!(Error::ConnectorWrite("test".to_string()).should_log());

        assert!(!Error::UserNotFound("test".to_string()).should_log());
        assert!(!Error::Client("test".to_string()).should_log());
        assert!(!Error::Authentication("test".to_string()).should_log());
    }

    #[test]
    fn test_error_partial_eq() {
        let err1 = Error::UserNotFound("test".to_string());
        let err2 = Error::UserNotFound("test".to_string());
        let err3 = Error::UserNotFound("other".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
