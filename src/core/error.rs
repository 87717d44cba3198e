//! Error types for tripcost-fetch
//!
//! Run-level errors are fatal and abort the command. Per-call failures of the
//! distance-matrix service are reported as [`QueryFailure`] instead, so one bad
//! grid cell never aborts the whole run.

use std::fmt;

/// Main error type for tripcost-fetch operations
#[derive(Debug)]
pub enum Error {
    /// Required run-time configuration is missing (e.g. the service credential)
    Configuration(String),

    /// Invalid parameters or input data
    InvalidInput(String),

    /// HTTP-specific error
    HttpError(String),

    /// Network connectivity issues
    NetworkError(String),

    /// File I/O error
    IoError(std::io::Error),

    /// JSON (de)serialization error
    JsonError(serde_json::Error),

    /// The pricing page was fetched but not every fuel price could be extracted
    ScrapeFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {}", msg)
            }
            Error::HttpError(msg) => {
                write!(f, "HTTP error: {}", msg)
            }
            Error::NetworkError(msg) => {
                write!(f, "Network error: {}", msg)
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {}", err)
            }
            Error::JsonError(err) => {
                write!(f, "JSON error: {}", err)
            }
            Error::ScrapeFailed(msg) => {
                write!(f, "Could not scrape fuel prices: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            Error::JsonError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Error::NetworkError(err.to_string())
        } else {
            Error::HttpError(err.to_string())
        }
    }
}

/// Convenience result type for tripcost-fetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single distance-matrix call.
///
/// Recovered at the sub-query level: the caller logs it and moves on to the
/// next grid cell.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFailure {
    /// The call did not complete (network error, timeout or non-success HTTP status)
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The call completed but the service reported a non-OK overall status
    Service {
        status: String,
        message: Option<String>,
    },
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFailure::Transport {
                status: Some(code),
                message,
            } => write!(f, "HTTP Error: {} {}", code, message),
            QueryFailure::Transport {
                status: None,
                message,
            } => write!(f, "Transport error: {}", message),
            QueryFailure::Service {
                status,
                message: Some(message),
            } => write!(f, "API Error: {} - {}", status, message),
            QueryFailure::Service {
                status,
                message: None,
            } => write!(f, "API Error: {}", status),
        }
    }
}

impl From<reqwest::Error> for QueryFailure {
    fn from(err: reqwest::Error) -> Self {
        QueryFailure::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
