use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Main error type for the echodb service
#[derive(Debug)]
pub enum EchoError {
    /// Configuration or CLI argument errors
    Config(String),

    /// Gossip protocol errors
    Gossip(GossipError),

    /// System I/O errors
    Io(std::io::Error),

    /// Outbound HTTP transport errors
    Transport(String),

    /// Serialization/deserialization errors
    Serialization(serde_json::Error),

    /// Internal lock poisoning or concurrency errors
    Concurrency(String),
}

/// Gossip protocol specific errors
#[derive(Debug)]
pub enum GossipError {
    /// Payload parsing or validation errors
    Message(String),

    /// A peer could not be reached or refused the update
    Delivery { peer: String, reason: String },
}

impl fmt::Display for EchoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EchoError::Config(msg) => write!(f, "Configuration error: {}", msg),
            EchoError::Gossip(err) => write!(f, "Gossip error: {}", err),
            EchoError::Io(err) => write!(f, "I/O error: {}", err),
            EchoError::Transport(msg) => write!(f, "Transport error: {}", msg),
            EchoError::Serialization(err) => write!(f, "Serialization error: {}", err),
            EchoError::Concurrency(msg) => write!(f, "Concurrency error: {}", msg),
        }
    }
}

impl fmt::Display for GossipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GossipError::Message(msg) => write!(f, "Message: {}", msg),
            GossipError::Delivery { peer, reason } => {
                write!(f, "Delivery to {} failed: {}", peer, reason)
            }
        }
    }
}

impl std::error::Error for EchoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EchoError::Io(err) => Some(err),
            EchoError::Serialization(err) => Some(err),
            EchoError::Gossip(err) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for GossipError {}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, EchoError>;

impl EchoError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            EchoError::Config(_) => StatusCode::BAD_REQUEST,
            EchoError::Gossip(GossipError::Message(_)) => StatusCode::BAD_REQUEST,
            EchoError::Gossip(_) => StatusCode::SERVICE_UNAVAILABLE,
            EchoError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EchoError::Transport(_) => StatusCode::BAD_GATEWAY,
            EchoError::Serialization(_) => StatusCode::BAD_REQUEST,
            EchoError::Concurrency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            EchoError::Config(_) => "configuration_error",
            EchoError::Gossip(_) => "gossip_error",
            EchoError::Io(_) => "io_error",
            EchoError::Transport(_) => "transport_error",
            EchoError::Serialization(_) => "serialization_error",
            EchoError::Concurrency(_) => "concurrency_error",
        }
    }
}

// Axum IntoResponse implementation for HTTP error responses
impl IntoResponse for EchoError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.to_string(),
                "type": self.error_type(),
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

// Conversions from common error types
impl From<std::io::Error> for EchoError {
    fn from(err: std::io::Error) -> Self {
        EchoError::Io(err)
    }
}

impl From<serde_json::Error> for EchoError {
    fn from(err: serde_json::Error) -> Self {
        EchoError::Serialization(err)
    }
}

impl From<GossipError> for EchoError {
    fn from(err: GossipError) -> Self {
        EchoError::Gossip(err)
    }
}

impl From<reqwest::Error> for EchoError {
    fn from(err: reqwest::Error) -> Self {
        EchoError::Transport(err.to_string())
    }
}

// Helper macros for common error construction patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::EchoError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::EchoError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! concurrency_error {
    ($msg:expr) => {
        $crate::error::EchoError::Concurrency($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::EchoError::Concurrency(format!($fmt, $($arg)*))
    };
}
