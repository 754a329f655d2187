//! Error types for mys3-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for mys3-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for mys3-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or expired credential; the user should re-enter credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Named credential, bucket or key absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or service failure during list/upload/delete/sign
    #[error("Transport error: {0}")]
    Transport(String),

    /// Persisted credential collection has an unexpected shape
    #[error("Corrupted state: {0}")]
    CorruptedState(String),

    /// Request rejected before reaching storage or the object store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid bucket/prefix path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::Config(_) => 2, // UsageError
            Error::Transport(_) => 3,                      // TransportError
            Error::Auth(_) => 4,                           // AuthError
            Error::NotFound(_) => 5,                       // NotFound
            Error::Validation(_) => 6,                     // ValidationError
            _ => 1,                                        // GeneralError
        }
    }

    /// Whether the user should be prompted to enter credentials again
    pub const fn needs_credentials(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    /// Stable short name of the error kind, safe to report without details
    pub const fn kind(&self) -> &'static str {
        match self {
            Error::Auth(_) => "auth",
            Error::NotFound(_) => "not_found",
            Error::Transport(_) => "transport",
            Error::CorruptedState(_) => "corrupted_state",
            Error::Validation(_) => "validation",
            Error::Config(_) | Error::TomlParse(_) | Error::TomlSerialize(_) => "config",
            Error::InvalidPath(_) => "invalid_path",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
        }
    }
}
