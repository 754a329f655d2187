//! Exit code definitions for the mys3 CLI
//!
//! Scripts rely on these values; changing one is a breaking change.

use mys3_core::Error;

/// Exit codes for the mys3 CLI application.
///
/// Each failure class of the browser maps to its own code so that scripts
/// can tell a rejected credential from an unreachable service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,

    /// General/unspecified error, including repaired storage corruption
    GeneralError = 1,

    /// User input error: invalid arguments, malformed location, bad config
    UsageError = 2,

    /// Network or service failure during list/upload/delete/sign
    TransportError = 3,

    /// Credential rejected or missing; re-enter credentials
    AuthError = 4,

    /// Credential, bucket or object does not exist
    NotFound = 5,

    /// Request rejected before reaching storage or the object store
    ValidationError = 6,

    /// Operation was interrupted (e.g., Ctrl+C)
    Interrupted = 130,
}

impl ExitCode {
    /// Convert exit code to i32 for use with std::process::exit
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Create exit code from i32 value
    ///
    /// Returns None if the value doesn't correspond to a known exit code.
    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::GeneralError),
            2 => Some(Self::UsageError),
            3 => Some(Self::TransportError),
            4 => Some(Self::AuthError),
            5 => Some(Self::NotFound),
            6 => Some(Self::ValidationError),
            130 => Some(Self::Interrupted),
            _ => None,
        }
    }

    /// Exit code for a core error
    pub fn from_error(error: &Error) -> Self {
        Self::from_i32(error.exit_code()).unwrap_or(Self::GeneralError)
    }

    /// Get a human-readable description of the exit code
    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "Operation completed successfully",
            Self::GeneralError => "General error",
            Self::UsageError => "Invalid arguments or location format",
            Self::TransportError => "Network or service error",
            Self::AuthError => "Authentication failure",
            Self::NotFound => "Resource not found",
            Self::ValidationError => "Request rejected",
            Self::Interrupted => "Operation interrupted",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}
