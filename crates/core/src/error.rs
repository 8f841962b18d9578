//! Error types for R-Droid Router
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for R-Droid Router
#[derive(Error, Debug)]
pub enum RDroidError {
    #[error("No handler matches the intent: {0}")]
    NoMatchingHandler(String),

    #[error("Ambiguous match between {} handlers", candidates.len())]
    AmbiguousMatch {
        /// Flattened component names tied at the top priority
        candidates: Vec<String>,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("Cancellation requested")]
    CancellationRequested,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    XmlParse(String),
}

/// Result type alias for R-Droid Router operations
pub type Result<T> = std::result::Result<T, RDroidError>;

impl RDroidError {
    /// Check if the caller can reasonably recover from this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RDroidError::NoMatchingHandler(_)
                | RDroidError::AmbiguousMatch { .. }
                | RDroidError::PermissionDenied(_)
                | RDroidError::MalformedDescriptor(_)
                | RDroidError::CancellationRequested
                | RDroidError::NotFound(_)
        )
    }

    /// True for user-initiated cancellation, which should not surface error UI
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RDroidError::CancellationRequested)
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            RDroidError::NoMatchingHandler(msg) => format!("No app can handle this action: {}", msg),
            RDroidError::AmbiguousMatch { candidates } => {
                format!("Choose an app to continue ({} available)", candidates.len())
            }
            RDroidError::PermissionDenied(msg) => format!("Permission denied: {}", msg),
            RDroidError::MalformedDescriptor(msg) => format!("Invalid request: {}", msg),
            RDroidError::CancellationRequested => "Operation was cancelled".to_string(),
            RDroidError::Io(e) => format!("File operation failed: {}", e),
            RDroidError::Config(msg) => format!("Configuration error: {}", msg),
            RDroidError::NotFound(msg) => format!("Not found: {}", msg),
            _ => self.to_string(),
        }
    }
}
