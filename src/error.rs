//! Unified error type for call-site analysis.

use thiserror::Error;

use crate::location::Location;

/// All errors that can occur while collecting, matching and reporting calls.
#[derive(Error, Debug)]
pub enum SigcovError {
    /// I/O error (file read, pipe write, directory access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error on the LSP wire
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The parser rejected the file. Fatal for that file only.
    #[error("ParseError in {file}{}: {message}", location.as_ref().map(|l| format!(" at {}", l)).unwrap_or_default())]
    Parse {
        file: String,
        location: Option<Location>,
        message: String,
    },

    /// A hover (or handshake) request did not answer in time.
    #[error("Request '{method}' timed out after {timeout_ms}ms")]
    QueryTimeout { method: String, timeout_ms: u64 },

    /// The service answered with a JSON-RPC error object.
    #[error("Request failed with code {code}: {message}")]
    Query { code: i64, message: String },

    /// The server process closed its output while a request was in flight.
    #[error("Type service disconnected")]
    Disconnected,

    /// A request was issued while no session is open.
    #[error("No open type service session")]
    SessionClosed,

    /// The type service command could not be started.
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed framing or an unexpected message shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The directory has no `sorbet/config`.
    #[error("Not in a Sorbet project: no sorbet/config found in '{dir}'")]
    NotSorbetProject { dir: String },

    /// File discovery produced nothing to analyze.
    #[error("No file matching sorbet/config in '{dir}'")]
    NoInputFiles { dir: String },
}

impl SigcovError {
    /// Whether the session must be torn down and reopened after this failure.
    pub fn needs_restart(&self) -> bool {
        matches!(self, Self::QueryTimeout { .. } | Self::Disconnected)
    }
}

pub type Result<T> = std::result::Result<T, SigcovError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = SigcovError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_parse_error_with_location() {
        let err = SigcovError::Parse {
            file: "lib/a.rb".to_string(),
            location: Some(Location::new("lib/a.rb", 3, 4, 3, 9)),
            message: "unexpected token".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("ParseError in lib/a.rb at lib/a.rb:3:4-3:9"));
        assert!(msg.contains("unexpected token"));
    }

    #[test]
    fn test_parse_error_without_location() {
        let err = SigcovError::Parse {
            file: "lib/a.rb".to_string(),
            location: None,
            message: "parser gave up".to_string(),
        };
        assert_eq!(err.to_string(), "ParseError in lib/a.rb: parser gave up");
    }

    #[test]
    fn test_timeout_display() {
        let err = SigcovError::QueryTimeout {
            method: "textDocument/hover".to_string(),
            timeout_ms: 5000,
        };
        assert!(err.to_string().contains("textDocument/hover"));
        assert!(err.to_string().contains("5000ms"));
    }

    #[test]
    fn test_not_sorbet_project_display() {
        let err = SigcovError::NotSorbetProject {
            dir: "/work/app".to_string(),
        };
        assert!(err.to_string().contains("/work/app"));
        assert!(err.to_string().contains("sorbet/config"));
    }

    #[test]
    fn test_needs_restart_only_for_transport_failures() {
        assert!(SigcovError::QueryTimeout { method: "x".into(), timeout_ms: 1 }.needs_restart());
        assert!(SigcovError::Disconnected.needs_restart());
        assert!(!SigcovError::Query { code: -32603, message: "boom".into() }.needs_restart());
        assert!(!SigcovError::SessionClosed.needs_restart());
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: SigcovError = io_err.into();
        assert!(matches!(err, SigcovError::Io(_)));
    }
}
