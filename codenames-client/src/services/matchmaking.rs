//! Match arrangement between lobby members.
//!
//! Both players must confirm a pending match before it becomes ready.
//! Notifications are published concurrently; listeners must not assume
//! `MatchPending` is observed before `MatchReady`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::settle;
use crate::callbacks::{CallbackBus, ServiceNotification};
use crate::config::{CallbackConcurrency, ProxyConfig};
use crate::connection::{ConnectionState, DuplexChannelFactory, DuplexConnection, DuplexService};
use crate::status::{OperationResult, ServiceReply, StatusCode};
use crate::types::{Match, MatchId, MatchRequest, PlayerId};

/// Matchmaking service contract.
#[derive(Debug, Clone, Copy)]
pub struct Matchmaking;

impl DuplexService for Matchmaking {
    const NAME: &'static str = "matchmaking";
    const CALLBACK_CONCURRENCY: CallbackConcurrency = CallbackConcurrency::Concurrent;
    type Request = MatchmakingRequest;
    type Response = ServiceReply;
    type Notification = MatchmakingNotification;
}

/// Outbound matchmaking operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchmakingRequest {
    /// Arrange a match with the lobby partner.
    RequestArrangedMatch(MatchRequest),
    /// Acknowledge a pending match.
    ConfirmMatchReceived {
        /// Confirming player.
        player_id: PlayerId,
        /// Pending match.
        match_id: MatchId,
    },
    /// Withdraw from a pending match.
    RequestMatchCancel {
        /// Withdrawing player.
        player_id: PlayerId,
        /// Pending match.
        match_id: MatchId,
    },
}

/// Matchmaking notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchmakingNotification {
    /// A match was arranged and awaits confirmation.
    MatchPending(Match),
    /// Both players confirmed; the match starts.
    MatchReady(Match),
    /// The match was canceled before starting.
    MatchCanceled {
        /// Canceled match.
        match_id: MatchId,
        /// Player that withdrew, if any.
        canceled_by: Option<PlayerId>,
    },
}

impl ServiceNotification for MatchmakingNotification {
    fn event_name(&self) -> &'static str {
        match self {
            MatchmakingNotification::MatchPending(_) => "match_pending",
            MatchmakingNotification::MatchReady(_) => "match_ready",
            MatchmakingNotification::MatchCanceled { .. } => "match_canceled",
        }
    }
}

/// Proxy for the matchmaking service.
#[derive(Debug, Clone)]
pub struct MatchmakingProxy {
    connection: DuplexConnection<Matchmaking>,
}

impl MatchmakingProxy {
    /// Create a proxy; no channel is opened until [`initialize`](Self::initialize).
    pub fn new(factory: Arc<dyn DuplexChannelFactory<Matchmaking>>, config: ProxyConfig) -> Self {
        Self {
            connection: DuplexConnection::new(factory, config),
        }
    }

    /// Open the channel for `player_id`.
    pub async fn initialize(&self, player_id: &PlayerId) -> OperationResult {
        self.connection.initialize(player_id).await
    }

    /// Close the channel.
    pub async fn disconnect(&self) {
        self.connection.disconnect().await
    }

    /// Ask for a match with `companion`.
    pub async fn request_arranged_match(&self, companion: &PlayerId) -> OperationResult {
        if companion.is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let companion = companion.clone();
        self.command("RequestArrangedMatch", move |requester| {
            MatchmakingRequest::RequestArrangedMatch(MatchRequest {
                requester: requester.clone(),
                companion,
            })
        })
        .await
    }

    /// Acknowledge the pending match `match_id`.
    pub async fn confirm_match_received(&self, match_id: &MatchId) -> OperationResult {
        if match_id.is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let match_id = match_id.clone();
        self.command("ConfirmMatchReceived", move |player_id| {
            MatchmakingRequest::ConfirmMatchReceived {
                player_id: player_id.clone(),
                match_id,
            }
        })
        .await
    }

    /// Withdraw from the pending match `match_id`.
    pub async fn request_match_cancel(&self, match_id: &MatchId) -> OperationResult {
        if match_id.is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let match_id = match_id.clone();
        self.command("RequestMatchCancel", move |player_id| {
            MatchmakingRequest::RequestMatchCancel {
                player_id: player_id.clone(),
                match_id,
            }
        })
        .await
    }

    /// Matchmaking notifications.
    pub fn callbacks(&self) -> &CallbackBus<MatchmakingNotification> {
        self.connection.callbacks()
    }

    /// Current channel state.
    pub async fn state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// Underlying connection.
    pub fn connection(&self) -> &DuplexConnection<Matchmaking> {
        &self.connection
    }

    async fn command<B>(&self, operation: &'static str, build: B) -> OperationResult
    where
        B: FnOnce(&PlayerId) -> MatchmakingRequest + Send,
    {
        settle(
            self.connection
                .call(operation, build, |reply| Ok(OperationResult::from_reply(reply)))
                .await,
        )
    }
}
