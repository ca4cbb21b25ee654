//! Connection management shared by every service proxy.
//!
//! - [`state`]: channel lifecycle state machine
//! - [`close`]: graceful-then-abort shutdown
//! - [`duplex`]: stateful channel with session identity and push callbacks
//! - [`one_way`]: fresh client per call

pub mod close;
pub mod duplex;
pub mod one_way;
pub mod state;

pub use close::{Closable, CloseOutcome, safe_close};
pub use duplex::{DuplexChannel, DuplexChannelFactory, DuplexConnection, DuplexService};
pub use one_way::{OneWayClient, OneWayClientFactory, OneWayConnection, OneWayService};
pub use state::ConnectionState;

use crate::error::TransportError;
use crate::status::{FailureKind, StatusCode, classify};

/// Classify a transport failure for `service`.
///
/// Recognized failures are logged at debug level; unrecognized ones are
/// errors worth a diagnostic.
pub(crate) fn classify_failure(
    service: &'static str,
    operation: &'static str,
    err: &TransportError,
    unexpected: StatusCode,
) -> StatusCode {
    let kind = err.kind();
    let code = classify(kind, unexpected);
    if kind == FailureKind::Unexpected {
        tracing::error!(service, operation, error = %err, status = %code, "unexpected failure");
    } else {
        tracing::debug!(service, operation, error = %err, status = %code, "operation failed");
    }
    code
}
