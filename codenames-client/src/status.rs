//! Application-level result taxonomy.
//!
//! Every remote call made by a proxy ends in exactly one [`StatusCode`].
//! Transport failures never cross the proxy boundary: they are reduced to a
//! [`FailureKind`] and mapped through [`classify`], a pure function that is
//! shared by every service.
//!
//! # Classification Table
//!
//! | Failure                       | StatusCode            |
//! |-------------------------------|-----------------------|
//! | timeout waiting for server    | `ServerTimeout`       |
//! | endpoint not resolvable       | `ServerUnreachable`   |
//! | channel communication failure | `ServerUnavailable`   |
//! | channel faulted               | `ServerUnavailable`   |
//! | server-side fault reply       | `ServerError`         |
//! | anything else                 | service fallback      |
//!
//! The fallback is `ClientError` for every service except moderation, which
//! reports unclassified failures as `ServerError`.

use serde::{Deserialize, Serialize};

/// Result code attached to every proxy result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// Operation completed.
    Ok,
    /// Caller is not allowed to perform the operation (also: already connected).
    Unauthorized,
    /// Required input was missing or empty.
    MissingData,
    /// The server did not answer in time.
    ServerTimeout,
    /// The endpoint could not be resolved.
    ServerUnreachable,
    /// The channel to the server is not usable.
    ServerUnavailable,
    /// The server reported an internal fault.
    ServerError,
    /// Unexpected failure on the client side.
    ClientError,
}

impl StatusCode {
    /// Wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Unauthorized => "UNAUTHORIZED",
            StatusCode::MissingData => "MISSING_DATA",
            StatusCode::ServerTimeout => "SERVER_TIMEOUT",
            StatusCode::ServerUnreachable => "SERVER_UNREACHABLE",
            StatusCode::ServerUnavailable => "SERVER_UNAVAILABLE",
            StatusCode::ServerError => "SERVER_ERROR",
            StatusCode::ClientError => "CLIENT_ERROR",
        }
    }

    /// Whether the code describes a local validation failure.
    ///
    /// Local failures are detected before any remote call and never tear
    /// down a channel.
    pub fn is_local_validation(&self) -> bool {
        matches!(self, StatusCode::MissingData | StatusCode::Unauthorized)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport failure reduced to the dimension the taxonomy cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The server did not answer within the configured timeout.
    Timeout,
    /// The endpoint address could not be resolved.
    Unreachable,
    /// Channel-level communication failure.
    Communication,
    /// The channel was faulted by the transport or the server.
    Faulted,
    /// The server answered with a fault.
    ServerFault,
    /// Anything the taxonomy does not recognize.
    Unexpected,
}

/// Map a failure to its status code.
///
/// `unexpected` is the service-specific fallback for [`FailureKind::Unexpected`].
pub fn classify(kind: FailureKind, unexpected: StatusCode) -> StatusCode {
    match kind {
        FailureKind::Timeout => StatusCode::ServerTimeout,
        FailureKind::Unreachable => StatusCode::ServerUnreachable,
        FailureKind::Communication | FailureKind::Faulted => StatusCode::ServerUnavailable,
        FailureKind::ServerFault => StatusCode::ServerError,
        FailureKind::Unexpected => unexpected,
    }
}

/// Success flag and status code as returned by remote operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReply {
    /// Whether the server accepted the operation.
    pub is_success: bool,
    /// Code reported by the server.
    pub status_code: StatusCode,
}

impl ServiceReply {
    /// Successful reply.
    pub fn ok() -> Self {
        Self {
            is_success: true,
            status_code: StatusCode::Ok,
        }
    }

    /// Rejected reply carrying `code`.
    pub fn rejected(code: StatusCode) -> Self {
        Self {
            is_success: false,
            status_code: code,
        }
    }
}

/// Typed result of a proxy operation.
///
/// Exactly one status code is set. `is_success()` holds if and only if the
/// code is [`StatusCode::Ok`]; the constructors enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult<T = ()> {
    is_success: bool,
    status_code: StatusCode,
    payload: Option<T>,
}

impl OperationResult<()> {
    /// Successful result without payload.
    pub fn ok() -> Self {
        Self::success(())
    }

    /// Convert a server reply into a result.
    pub fn from_reply(reply: ServiceReply) -> Self {
        if reply.is_success {
            Self::ok()
        } else {
            Self::failure(reply.status_code)
        }
    }
}

impl<T> OperationResult<T> {
    /// Successful result carrying `payload`.
    pub fn success(payload: T) -> Self {
        Self {
            is_success: true,
            status_code: StatusCode::Ok,
            payload: Some(payload),
        }
    }

    /// Failed result.
    ///
    /// A failure cannot carry `Ok`; it is reported as `ClientError` instead.
    pub fn failure(code: StatusCode) -> Self {
        let status_code = match code {
            StatusCode::Ok => StatusCode::ClientError,
            other => other,
        };
        Self {
            is_success: false,
            status_code,
            payload: None,
        }
    }

    /// Build from a `Result` produced by a proxy core.
    pub fn from_outcome(outcome: Result<T, StatusCode>) -> Self {
        match outcome {
            Ok(payload) => Self::success(payload),
            Err(code) => Self::failure(code),
        }
    }

    /// Whether the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.is_success
    }

    /// Status code of the operation.
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Payload, present only on success.
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// Take the payload.
    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    /// Convert into a plain `Result`.
    pub fn into_result(self) -> Result<T, StatusCode> {
        match self.payload {
            Some(payload) if self.is_success => Ok(payload),
            _ => Err(self.status_code),
        }
    }

    /// Drop the payload, keeping the status.
    pub fn discard_payload(self) -> OperationResult<()> {
        OperationResult {
            is_success: self.is_success,
            status_code: self.status_code,
            payload: self.payload.map(|_| ()),
        }
    }
}
