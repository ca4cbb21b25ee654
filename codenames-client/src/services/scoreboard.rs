//! Leaderboard.
//!
//! Subscribing opens the channel; the server then pushes
//! [`ScoreboardNotification::LeaderboardUpdated`] whenever a match ends.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::callbacks::{CallbackBus, ServiceNotification};
use crate::config::{CallbackConcurrency, ProxyConfig};
use crate::connection::{ConnectionState, DuplexChannelFactory, DuplexConnection, DuplexService};
use crate::error::TransportError;
use crate::status::OperationResult;
use crate::types::{PlayerId, ScoreRecord};

/// Scoreboard service contract.
#[derive(Debug, Clone, Copy)]
pub struct Scoreboard;

impl DuplexService for Scoreboard {
    const NAME: &'static str = "scoreboard";
    const CALLBACK_CONCURRENCY: CallbackConcurrency = CallbackConcurrency::Concurrent;
    type Request = ScoreboardRequest;
    type Response = ScoreboardResponse;
    type Notification = ScoreboardNotification;
}

/// Outbound scoreboard operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreboardRequest {
    /// Score of `player_id`.
    GetMyScore {
        /// Player whose score is requested.
        player_id: PlayerId,
    },
    /// Best players, at most `limit`.
    GetTopPlayers {
        /// Maximum number of records.
        limit: u32,
    },
}

/// Replies of the scoreboard service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreboardResponse {
    /// A single score; `None` if the player has not played yet.
    Score(Option<ScoreRecord>),
    /// Ranked scores, best first.
    TopPlayers(Vec<ScoreRecord>),
}

/// Scoreboard notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreboardNotification {
    /// The top of the leaderboard changed.
    LeaderboardUpdated(Vec<ScoreRecord>),
}

impl ServiceNotification for ScoreboardNotification {
    fn event_name(&self) -> &'static str {
        match self {
            ScoreboardNotification::LeaderboardUpdated(_) => "leaderboard_updated",
        }
    }
}

/// Proxy for the scoreboard service.
#[derive(Debug, Clone)]
pub struct ScoreboardProxy {
    connection: DuplexConnection<Scoreboard>,
}

impl ScoreboardProxy {
    /// Create a proxy; no channel is opened until subscribed.
    pub fn new(factory: Arc<dyn DuplexChannelFactory<Scoreboard>>, config: ProxyConfig) -> Self {
        Self {
            connection: DuplexConnection::new(factory, config),
        }
    }

    /// Open the channel for `player_id` and start receiving leaderboard updates.
    pub async fn subscribe_to_scoreboard_updates(&self, player_id: &PlayerId) -> OperationResult {
        self.connection.initialize(player_id).await
    }

    /// Stop receiving updates and close the channel.
    pub async fn disconnect(&self) {
        self.connection.disconnect().await
    }

    /// Score of `player_id`.
    ///
    /// Resubscribes as `player_id` if the channel is not open. `None` on
    /// failure or if the player has no score yet.
    pub async fn get_my_score(&self, player_id: &PlayerId) -> Option<ScoreRecord> {
        let requested = player_id.clone();
        self.connection
            .call_as(
                "GetMyScore",
                player_id,
                move |_| ScoreboardRequest::GetMyScore {
                    player_id: requested,
                },
                |response| match response {
                    ScoreboardResponse::Score(score) => Ok(score),
                    other => Err(TransportError::unexpected_response("GetMyScore", &other)),
                },
            )
            .await
            .ok()
            .flatten()
    }

    /// Best `limit` players. Empty on failure.
    pub async fn get_top_players(&self, limit: u32) -> Vec<ScoreRecord> {
        if limit == 0 {
            return Vec::new();
        }
        self.connection
            .call(
                "GetTopPlayers",
                move |_| ScoreboardRequest::GetTopPlayers { limit },
                |response| match response {
                    ScoreboardResponse::TopPlayers(records) => Ok(records),
                    other => Err(TransportError::unexpected_response("GetTopPlayers", &other)),
                },
            )
            .await
            .unwrap_or_default()
    }

    /// Leaderboard notifications.
    pub fn callbacks(&self) -> &CallbackBus<ScoreboardNotification> {
        self.connection.callbacks()
    }

    /// Current channel state.
    pub async fn state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// Underlying connection.
    pub fn connection(&self) -> &DuplexConnection<Scoreboard> {
        &self.connection
    }
}
