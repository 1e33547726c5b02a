//! Unified error types for bandrelay.
//!
//! Each variant renders with a stable code prefix so tool callers can tell
//! "no data yet" apart from "cache broken" without parsing free text.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for bandrelay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL list entry).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Page fields could not be extracted, or the extracted record is incomplete.
    #[error("EXTRACT_FAILED: {0}")]
    ExtractFailed(String),

    /// The backing key/value medium rejected a read or a write, including
    /// SQLite and migration failures.
    #[error("STORAGE_UNAVAILABLE: {0}")]
    StorageUnavailable(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// The remote API rejected or failed a delivery.
    #[error("RELAY_FAILED: {0}")]
    RelayFailed(String),

    /// Relaying was requested but no API endpoint is configured.
    #[error("RELAY_DISABLED")]
    RelayDisabled,
}

impl Error {
    /// Wrap any medium failure as `StorageUnavailable`.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Error::StorageUnavailable(err.to_string())
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::storage("database connection closed"),
            tokio_rusqlite::Error::Close((_, e)) => Error::storage(format!("closing database: {e}")),
            other => Error::storage(other),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::storage(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::storage(err)
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::ExtractFailed(msg) => (-32000, msg.clone()),
            Error::StorageUnavailable(msg) => (-32002, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::HttpError(msg) => (-32008, msg.clone()),
            Error::RelayFailed(msg) => (-32009, msg.clone()),
            Error::RelayDisabled => (-32010, "Relay API is not configured".to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::StorageUnavailable("quota exceeded".to_string());
        assert!(err.to_string().contains("STORAGE_UNAVAILABLE"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::StorageUnavailable("disk full".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32002);
    }

    #[test]
    fn test_sqlite_errors_are_storage_unavailable() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::StorageUnavailable(_)));

        let closed: Error = tokio_rusqlite::Error::<Error>::ConnectionClosed.into();
        assert!(matches!(closed, Error::StorageUnavailable(_)));
        assert!(closed.to_string().starts_with("STORAGE_UNAVAILABLE"));
    }
}
