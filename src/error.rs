//! Error types for localhost port and process queries.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for localports operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ArgumentError),

    #[error("Permission denied while trying to {operation}: {source}")]
    PermissionDenied {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("No free port in {candidates}")]
    NoFreePort { candidates: String },

    #[error("No ephemeral port available on {host}: {source}")]
    EphemeralExhausted {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to {operation}: {source}")]
    Os {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("Timed out after {}ms while trying to {operation}", .timeout.as_millis())]
    Timeout { operation: String, timeout: Duration },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Validation failures, raised before any OS call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("port {0} is not valid here (must be 1-65535)")]
    InvalidPort(u16),

    #[error("invalid port '{0}'")]
    InvalidPortFormat(String),

    #[error("invalid port range {start}-{end} (start must not exceed end)")]
    InvalidRange { start: u16, end: u16 },

    #[error("invalid range format '{0}' (expected START-END, e.g. 8000-8999)")]
    InvalidRangeFormat(String),

    #[error("candidate port set is empty")]
    EmptyCandidates,

    #[error("malformed host '{0}' (expected 'localhost' or an IP address)")]
    InvalidHost(String),
}

/// Errors related to the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to lock config file at {path}: {source}")]
    LockFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
}

/// Coarse classification of an [`Error`], for callers that own retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    PermissionDenied,
    ResourceExhausted,
    TransientOsFailure,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::ResourceExhausted => "resource exhausted",
            ErrorKind::TransientOsFailure => "transient OS failure",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Error::NoFreePort { .. } | Error::EphemeralExhausted { .. } => {
                ErrorKind::ResourceExhausted
            }
            Error::Os { .. } | Error::Timeout { .. } => ErrorKind::TransientOsFailure,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Wraps an OS error, splitting permission failures from the rest.
    pub(crate) fn from_os(operation: impl Into<String>, source: io::Error) -> Self {
        let operation = operation.into();
        match source.kind() {
            io::ErrorKind::PermissionDenied => Error::PermissionDenied { operation, source },
            _ => Error::Os { operation, source },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
