//! Identity bridge error types
//!
//! A closed taxonomy that every backend translates its protocol failures into,
//! with transient/permanent classification for callers deciding whether to retry.

use thiserror::Error;

/// Error that can occur during identity bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // Transport errors (usually transient)
    /// Failed to reach or talk to the directory server.
    #[error("connection failed: {message}")]
    ConnectionError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The directory did not answer in time.
    #[error("directory operation timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    // Authentication errors (permanent)
    /// The directory rejected the bind.
    #[error("authentication failed: invalid credentials")]
    InvalidCredentials,

    /// An operation was attempted on a connection that is not authenticated.
    #[error("operation requires a bound connection")]
    NotBound,

    // Caller errors (permanent)
    /// The session token is unknown or its session has been evicted.
    #[error("paged search session '{token}' expired, restart pagination")]
    SessionExpired { token: String },

    /// Caller input was malformed.
    #[error("validation failed: {message}")]
    ValidationError { message: String },

    /// The internal role name has no configured directory group.
    #[error("role '{role}' is not mapped to a directory group")]
    RoleNotFound { role: String },

    /// The mapped directory group does not exist.
    #[error("directory group '{group}' not found")]
    GroupNotFound { group: String },

    /// The result type has no registered field mapping.
    #[error("no field mapping registered for {type_name}")]
    MappingError { type_name: String },

    // Configuration errors (permanent)
    /// Settings were rejected at construction time.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Generic wrapper
    /// Directory failure with a result code the bridge does not recognize.
    #[error("directory error (code {code}): {message}")]
    Directory {
        code: u32,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BridgeError {
    /// Check if this error is transient and the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BridgeError::ConnectionError { .. } | BridgeError::Timeout { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            BridgeError::ConnectionError { .. } => "CONNECTION_ERROR",
            BridgeError::Timeout { .. } => "TIMEOUT",
            BridgeError::InvalidCredentials => "INVALID_CREDENTIALS",
            BridgeError::NotBound => "NOT_BOUND",
            BridgeError::SessionExpired { .. } => "SESSION_EXPIRED",
            BridgeError::ValidationError { .. } => "VALIDATION_ERROR",
            BridgeError::RoleNotFound { .. } => "ROLE_NOT_FOUND",
            BridgeError::GroupNotFound { .. } => "GROUP_NOT_FOUND",
            BridgeError::MappingError { .. } => "MAPPING_ERROR",
            BridgeError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            BridgeError::Directory { .. } => "DIRECTORY_ERROR",
        }
    }

    // Convenience constructors

    /// Create a connection error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        BridgeError::ConnectionError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        BridgeError::ConnectionError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        BridgeError::ValidationError {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        BridgeError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a session expired error for the given token.
    pub fn session_expired(token: impl Into<String>) -> Self {
        BridgeError::SessionExpired {
            token: token.into(),
        }
    }

    /// Wrap an unrecognized directory result code.
    pub fn directory(code: u32, message: impl Into<String>) -> Self {
        BridgeError::Directory {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an unrecognized directory failure with source.
    pub fn directory_with_source(
        code: u32,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        BridgeError::Directory {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for identity bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
