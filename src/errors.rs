use thiserror::Error;
use uuid::Uuid;

use crate::affordances::ClickTarget;

/// Top-level error type for the Catan client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Wire decoding errors. A failing action is skipped, never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Unrecognized action tag '{tag}'")]
    UnknownTag { tag: String },

    #[error("Malformed action: {details}")]
    MalformedAction { details: String },

    #[error("Malformed coordinate: {details}")]
    MalformedCoordinate { details: String },

    #[error("Invalid parameters for {tag}: {details}")]
    InvalidParameters { tag: String, details: String },

    #[error("{tag} at {target} conflicts with an earlier action there")]
    DuplicateTarget { tag: String, target: String },

    #[error("Message deserialization failed: {details}")]
    DeserializationFailed { details: String },

    #[error("Message serialization failed: {details}")]
    SerializationFailed { details: String },
}

/// Geometry that cannot be rendered as-is and needs a fallback placement
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Degenerate segment: {details}")]
    Degenerate { details: String },

    #[error("Unknown direction '{label}'")]
    UnknownDirection { label: String },

    #[error("Malformed node key '{key}'")]
    MalformedNodeKey { key: String },
}

/// Errors raised by the client state synchronizer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("No snapshot received yet")]
    NotSynced,

    #[error("Action {request_id} is still awaiting a response")]
    ActionInFlight { request_id: Uuid },

    #[error("No legal action at {target}")]
    NoAffordance { target: ClickTarget },

    #[error("Action {request_id} timed out")]
    Timeout { request_id: Uuid },

    #[error("Server rejected the request: {reason}")]
    Rejected { reason: String },

    #[error("Not connected")]
    Disconnected,
}

/// Transport failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Send failed: {details}")]
    SendFailed { details: String },

    #[error("Receive failed: {details}")]
    ReceiveFailed { details: String },

    #[error("Connection closed")]
    Closed,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Result type aliases for convenience
pub type ClientResult<T> = Result<T, ClientError>;
pub type ProtocolResult<T> = Result<T, ProtocolError>;
pub type GeometryResult<T> = Result<T, GeometryError>;

impl ProtocolError {
    pub fn malformed(details: impl Into<String>) -> Self {
        Self::MalformedAction {
            details: details.into(),
        }
    }

    pub fn invalid_parameters(tag: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidParameters {
            tag: tag.into(),
            details: details.into(),
        }
    }
}

impl GeometryError {
    pub fn degenerate(details: impl Into<String>) -> Self {
        Self::Degenerate {
            details: details.into(),
        }
    }
}

impl TransportError {
    pub fn send_failed(details: impl Into<String>) -> Self {
        Self::SendFailed {
            details: details.into(),
        }
    }
}
