//! Channel lifecycle state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle of the channel owned by a duplex proxy.
///
/// # State Transitions
///
/// ```text
///            open + Connect ok
/// Created ──────────────────────► Opened ──disconnect/failure──► Closing ──► Closed
///    │                             ▲  │                                        │
///    │ open/Connect failed         │  └──────────fault signal──────► Faulted   │
///    ▼                             │                                  │        │
///  Closed ◄────────────────────────┴──────── reconnect ───────────────┴────────┘
/// ```
///
/// # Invariants
///
/// - Only `Opened` is usable; every stateful operation checks it first
/// - `Faulted` guards like `Closed` but stays distinguishable for diagnostics
/// - `Closing` is transient: the channel has already been detached from the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No channel has been opened yet.
    Created,

    /// Channel is live and a session identity is bound.
    Opened,

    /// Channel is being torn down.
    Closing,

    /// Channel torn down, no session.
    Closed,

    /// Transport or server reported an unrecoverable channel error.
    Faulted,
}

impl ConnectionState {
    /// Check if transition to next state is valid.
    ///
    /// # Valid Transitions
    ///
    /// - Created/Closed/Faulted → Opened (open and Connect succeeded)
    /// - Created/Closed/Faulted → Closed (open or Connect failed)
    /// - Opened → Closing (explicit disconnect or caught failure)
    /// - Opened → Faulted (out-of-band fault)
    /// - Closing → Closed
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Created | Closed | Faulted, Opened)
                | (Created | Closed | Faulted, Closed)
                | (Opened, Closing)
                | (Opened, Faulted)
                | (Closing, Closed)
        )
    }

    /// Check if stateful operations may use the channel.
    pub fn is_usable(&self) -> bool {
        matches!(self, ConnectionState::Opened)
    }

    /// Check if a new channel may be opened from this state.
    pub fn can_open(&self) -> bool {
        self.can_transition_to(ConnectionState::Opened)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Created => "created",
            ConnectionState::Opened => "opened",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
            ConnectionState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}
