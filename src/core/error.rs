//! Typed error handling for the dog-finder client
//!
//! Callers can match on the specific failure instead of receiving an opaque
//! `anyhow::Error`.
//!
//! # Error Categories
//!
//! - [`NetworkError`]: any failed call to the remote catalog
//! - [`SelectionError`]: a match requested with nothing selected, or
//!   overtaken by a change of favorites
//! - [`FilterError`]: filter form input that cannot become criteria
//! - [`LoginError`]: sign-in details rejected before any request
//! - [`ConfigError`]: configuration parsing and validation
//!
//! A response superseded by a newer request is *not* an error. See
//! [`FetchOutcome`](crate::table::FetchOutcome).
//!
//! # Example
//!
//! ```rust,ignore
//! match table.match_favorites().await {
//!     Ok(id) => println!("Matched {}", id),
//!     Err(FinderError::Selection(SelectionError::Empty)) => {
//!         println!("Pick at least one favorite first");
//!     }
//!     Err(FinderError::Network(NetworkError::Unauthorized { .. })) => {
//!         redirect_to_login();
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use serde::Serialize;
use std::fmt;

pub use crate::core::auth::LoginError;
pub use crate::core::filter::FilterError;

/// The main error type for the dog-finder client
#[derive(Debug)]
pub enum FinderError {
    /// Remote catalog call failed
    Network(NetworkError),

    /// Favorites/match precondition failed
    Selection(SelectionError),

    /// Filter form input was rejected
    Filter(FilterError),

    /// Sign-in form input was rejected
    Login(LoginError),

    /// Configuration errors
    Config(ConfigError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for FinderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinderError::Network(e) => write!(f, "{}", e),
            FinderError::Selection(e) => write!(f, "{}", e),
            FinderError::Filter(e) => write!(f, "{}", e),
            FinderError::Login(e) => write!(f, "{}", e),
            FinderError::Config(e) => write!(f, "{}", e),
            FinderError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for FinderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FinderError::Network(e) => Some(e),
            FinderError::Selection(e) => Some(e),
            FinderError::Filter(e) => Some(e),
            FinderError::Login(e) => Some(e),
            FinderError::Config(e) => Some(e),
            FinderError::Internal(_) => None,
        }
    }
}

/// Error summary suitable for a banner or a JSON log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl FinderError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            FinderError::Network(e) => e.error_code(),
            FinderError::Selection(e) => e.error_code(),
            FinderError::Filter(e) => e.error_code(),
            FinderError::Login(e) => e.error_code(),
            FinderError::Config(_) => "CONFIG_ERROR",
            FinderError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the session cookie expired and the user must sign in again
    pub fn requires_login(&self) -> bool {
        matches!(self, FinderError::Network(NetworkError::Unauthorized { .. }))
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        }
    }
}

// =============================================================================
// Network Errors
// =============================================================================

/// Errors raised by calls to the remote catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The request never produced a response (DNS, connect, TLS, reset)
    Transport { endpoint: String, message: String },

    /// The service answered with a non-success status
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The session cookie is missing or expired
    Unauthorized { endpoint: String },

    /// The response body did not match the expected shape
    Decode { endpoint: String, message: String },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Transport { endpoint, message } => {
                write!(f, "Request to '{}' failed: {}", endpoint, message)
            }
            NetworkError::Status {
                endpoint,
                status,
                message,
            } => {
                write!(
                    f,
                    "Request to '{}' returned status {}: {}",
                    endpoint, status, message
                )
            }
            NetworkError::Unauthorized { endpoint } => {
                write!(f, "Not signed in (request to '{}' was rejected)", endpoint)
            }
            NetworkError::Decode { endpoint, message } => {
                write!(f, "Unexpected response from '{}': {}", endpoint, message)
            }
        }
    }
}

impl std::error::Error for NetworkError {}

impl NetworkError {
    pub fn error_code(&self) -> &'static str {
        match self {
            NetworkError::Transport { .. } => "NETWORK_TRANSPORT",
            NetworkError::Status { .. } => "NETWORK_STATUS",
            NetworkError::Unauthorized { .. } => "UNAUTHORIZED",
            NetworkError::Decode { .. } => "NETWORK_DECODE",
        }
    }

    /// The endpoint (path or cursor) the failed request targeted
    pub fn endpoint(&self) -> &str {
        match self {
            NetworkError::Transport { endpoint, .. }
            | NetworkError::Status { endpoint, .. }
            | NetworkError::Unauthorized { endpoint }
            | NetworkError::Decode { endpoint, .. } => endpoint,
        }
    }
}

impl From<NetworkError> for FinderError {
    fn from(err: NetworkError) -> Self {
        FinderError::Network(err)
    }
}

// =============================================================================
// Selection Errors
// =============================================================================

/// Errors related to the favorites selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// A match was requested with no favorites selected
    Empty,

    /// The favorites changed, or a newer match was requested, while this
    /// match was in flight; its result was dropped
    Changed,
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::Empty => write!(f, "Select at least one favorite before matching"),
            SelectionError::Changed => {
                write!(f, "Favorites changed before the match arrived, request a new match")
            }
        }
    }
}

impl std::error::Error for SelectionError {}

impl SelectionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SelectionError::Empty => "EMPTY_SELECTION",
            SelectionError::Changed => "SELECTION_CHANGED",
        }
    }
}

impl From<SelectionError> for FinderError {
    fn from(err: SelectionError) -> Self {
        FinderError::Selection(err)
    }
}

impl From<FilterError> for FinderError {
    fn from(err: FilterError) -> Self {
        FinderError::Filter(err)
    }
}

impl From<LoginError> for FinderError {
    fn from(err: LoginError) -> Self {
        FinderError::Login(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to parse configuration file
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for FinderError {
    fn from(err: ConfigError) -> Self {
        FinderError::Config(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for FinderError {
    fn from(err: anyhow::Error) -> Self {
        // Typed errors wrapped in anyhow come back out unchanged
        match err.downcast::<FinderError>() {
            Ok(finder) => finder,
            Err(err) => match err.downcast::<NetworkError>() {
                Ok(network) => FinderError::Network(network),
                Err(err) => FinderError::Internal(err.to_string()),
            },
        }
    }
}

/// Result alias used across the crate
pub type FinderResult<T> = std::result::Result<T, FinderError>;
