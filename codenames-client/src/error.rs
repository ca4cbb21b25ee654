//! Error types for the client layer.
//!
//! [`TransportError`] is what transport bindings report. It never reaches
//! callers of a proxy: proxies classify it into a
//! [`StatusCode`](crate::StatusCode) and return a typed result.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::status::FailureKind;

/// Errors reported by a transport binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No answer within the allotted time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The endpoint address could not be resolved.
    #[error("endpoint not found: {0}")]
    EndpointNotFound(String),

    /// Channel-level communication failure.
    #[error("communication failure: {0}")]
    Communication(String),

    /// The channel is faulted and can no longer be used.
    #[error("channel faulted: {0}")]
    Faulted(String),

    /// The server answered with a fault.
    #[error("service fault: {0}")]
    Service(String),

    /// The server answered with a message the operation does not expect.
    #[error("unexpected response to {operation}: {response}")]
    Protocol {
        /// Operation that received the response.
        operation: &'static str,
        /// Debug rendering of the response.
        response: String,
    },

    /// Any other failure.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl TransportError {
    /// Build a [`TransportError::Protocol`] from a mismatched response.
    pub fn unexpected_response(operation: &'static str, response: &impl std::fmt::Debug) -> Self {
        TransportError::Protocol {
            operation,
            response: format!("{response:?}"),
        }
    }

    /// Failure kind used for classification.
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::Timeout(_) => FailureKind::Timeout,
            TransportError::EndpointNotFound(_) => FailureKind::Unreachable,
            TransportError::Communication(_) => FailureKind::Communication,
            TransportError::Faulted(_) => FailureKind::Faulted,
            TransportError::Service(_) => FailureKind::ServerFault,
            TransportError::Protocol { .. } | TransportError::Unexpected(_) => {
                FailureKind::Unexpected
            }
        }
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Run `future` with a deadline, mapping expiry to [`TransportError::Timeout`].
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> TransportResult<T>
where
    F: Future<Output = TransportResult<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(duration)),
    }
}

/// Errors raised while loading client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A timeout was configured as zero.
    #[error("{field} must be greater than zero")]
    ZeroTimeout {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The callback buffer was configured as zero.
    #[error("callback_buffer must be greater than zero")]
    ZeroCallbackBuffer,
}
