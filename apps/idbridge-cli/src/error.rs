//! CLI error types and exit codes

use idbridge::error::BridgeError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General or configuration error
/// - 2: Authentication failed
/// - 3: Directory unreachable
/// - 4: Invalid input or nothing found
/// - 5: Directory error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Io(_) => 1,
            CliError::NotFound(_) => 4,
            CliError::Bridge(e) => match e {
                BridgeError::InvalidCredentials | BridgeError::NotBound => 2,
                BridgeError::ConnectionError { .. } | BridgeError::Timeout { .. } => 3,
                BridgeError::SessionExpired { .. }
                | BridgeError::ValidationError { .. }
                | BridgeError::RoleNotFound { .. }
                | BridgeError::GroupNotFound { .. }
                | BridgeError::MappingError { .. } => 4,
                BridgeError::InvalidConfiguration { .. } => 1,
                BridgeError::Directory { .. } => 5,
            },
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Config(_) => Some("Check the file passed with --config (default idbridge.json)."),
            CliError::Bridge(BridgeError::ConnectionError { .. }) => {
                Some("Check that the directory server is reachable from this host.")
            }
            CliError::Bridge(BridgeError::RoleNotFound { .. }) => {
                Some("Add the role to the \"roles\" map of the bridge settings.")
            }
            CliError::Bridge(BridgeError::InvalidConfiguration { .. }) => {
                Some("Set IDBRIDGE_SERVICE_PASSWORD or service_password in the config file.")
            }
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Config(format!("JSON error: {}", e))
    }
}
