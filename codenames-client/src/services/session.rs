//! Presence session.
//!
//! The session channel is the first one a player opens after logging in.
//! While it is open the server announces friends coming online and going
//! offline, and may end the session with [`SessionNotification::Kicked`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::callbacks::{CallbackBus, ServiceNotification};
use crate::config::{CallbackConcurrency, ProxyConfig};
use crate::connection::{ConnectionState, DuplexChannelFactory, DuplexConnection, DuplexService};
use crate::status::OperationResult;
use crate::types::{KickReason, PlayerId};

/// Session service contract.
#[derive(Debug, Clone, Copy)]
pub struct Session;

impl DuplexService for Session {
    const NAME: &'static str = "session";
    const CALLBACK_CONCURRENCY: CallbackConcurrency = CallbackConcurrency::Reentrant;
    type Request = SessionRequest;
    type Response = Vec<PlayerId>;
    type Notification = SessionNotification;
}

/// Outbound session operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionRequest {
    /// Friends of `player_id` currently connected.
    GetOnlineFriends {
        /// Requesting player.
        player_id: PlayerId,
    },
}

/// Presence notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionNotification {
    /// A friend opened a session.
    FriendOnline {
        /// Friend that connected.
        friend_id: PlayerId,
    },
    /// A friend's session ended.
    FriendOffline {
        /// Friend that disconnected.
        friend_id: PlayerId,
    },
    /// The server ended this session.
    Kicked {
        /// Why.
        reason: KickReason,
    },
}

impl ServiceNotification for SessionNotification {
    fn event_name(&self) -> &'static str {
        match self {
            SessionNotification::FriendOnline { .. } => "friend_online",
            SessionNotification::FriendOffline { .. } => "friend_offline",
            SessionNotification::Kicked { .. } => "kicked",
        }
    }
}

/// Proxy for the session service.
#[derive(Debug, Clone)]
pub struct SessionProxy {
    connection: DuplexConnection<Session>,
}

impl SessionProxy {
    /// Create a proxy; no channel is opened until [`initialize`](Self::initialize).
    pub fn new(factory: Arc<dyn DuplexChannelFactory<Session>>, config: ProxyConfig) -> Self {
        Self {
            connection: DuplexConnection::new(factory, config),
        }
    }

    /// Open the session for `player_id`.
    pub async fn initialize(&self, player_id: &PlayerId) -> OperationResult {
        self.connection.initialize(player_id).await
    }

    /// Close the session.
    pub async fn disconnect(&self) {
        self.connection.disconnect().await
    }

    /// Friends of the bound player that are online. Empty on failure.
    pub async fn online_friends(&self) -> Vec<PlayerId> {
        self.connection
            .call(
                "GetOnlineFriends",
                |player_id| SessionRequest::GetOnlineFriends {
                    player_id: player_id.clone(),
                },
                Ok,
            )
            .await
            .unwrap_or_default()
    }

    /// Presence notifications.
    pub fn callbacks(&self) -> &CallbackBus<SessionNotification> {
        self.connection.callbacks()
    }

    /// Current channel state.
    pub async fn state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// Underlying connection.
    pub fn connection(&self) -> &DuplexConnection<Session> {
        &self.connection
    }
}
