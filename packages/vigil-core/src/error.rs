//! Centralized error types for the Vigil core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Gives every error a machine-readable code for callers and event payloads
//! - Maps layer-specific errors (REST, socket, sink) onto the live-view taxonomy

use serde::Serialize;
use thiserror::Error;

use crate::cloud::CloudError;
use crate::liveview::sink::SinkError;
use crate::liveview::transport::TransportError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for CloudError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::MissingCredentials => "missing_credentials",
            Self::Malformed(_) => "malformed_payload",
        }
    }
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connect(_) => "socket_connect_failed",
            Self::Send(_) => "socket_send_failed",
            Self::Closed => "socket_closed",
        }
    }
}

impl ErrorCode for SinkError {
    fn code(&self) -> &'static str {
        match self {
            Self::Initialize(_) => "sink_initialize_failed",
            Self::Append(_) => "sink_append_failed",
            Self::NotInitialized => "sink_not_initialized",
        }
    }
}

/// Application-wide error type for live-view and command operations.
#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum VigilError {
    /// The live-view descriptor could not be fetched (bad credentials,
    /// non-success status or malformed payload).
    #[error("Config resolution failed: {0}")]
    ConfigResolution(String),

    /// The stream socket failed or closed unexpectedly.
    #[error("Transport failed: {0}")]
    Transport(String),

    /// A control frame could not be understood.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A device command could not be started.
    #[error("Command dispatch failed: {0}")]
    CommandDispatch(String),

    /// A device command did not complete within its attempt budget.
    #[error("Command {command_id} did not complete after {attempts} attempts")]
    CommandTimeout {
        /// Identifier of the command that timed out.
        command_id: u64,
        /// Number of status requests that were issued.
        attempts: u32,
    },

    /// The playback sink rejected a segment or failed to initialize.
    #[error("Sink error: {0}")]
    Sink(String),

    /// Caller sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl VigilError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigResolution(_) => "config_resolution_failed",
            Self::Transport(_) => "transport_failed",
            Self::Protocol(_) => "protocol_error",
            Self::CommandDispatch(_) => "command_dispatch_failed",
            Self::CommandTimeout { .. } => "command_timeout",
            Self::Sink(_) => "sink_error",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl ErrorCode for VigilError {
    fn code(&self) -> &'static str {
        VigilError::code(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

// Re-export Result type aliases from their defining modules
pub use crate::cloud::CloudResult;

/// Convenient Result alias for library-wide operations.
pub type VigilResult<T> = Result<T, VigilError>;

impl From<TransportError> for VigilError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<SinkError> for VigilError {
    fn from(err: SinkError) -> Self {
        Self::Sink(err.to_string())
    }
}
