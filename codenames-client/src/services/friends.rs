//! Friend list and friend requests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::settle;
use crate::callbacks::{CallbackBus, ServiceNotification};
use crate::config::{CallbackConcurrency, ProxyConfig};
use crate::connection::{ConnectionState, DuplexChannelFactory, DuplexConnection, DuplexService};
use crate::error::{TransportError, TransportResult};
use crate::status::{OperationResult, ServiceReply, StatusCode};
use crate::types::{Player, PlayerId};

/// Friends service contract.
#[derive(Debug, Clone, Copy)]
pub struct Friends;

impl DuplexService for Friends {
    const NAME: &'static str = "friends";
    const CALLBACK_CONCURRENCY: CallbackConcurrency = CallbackConcurrency::Reentrant;
    type Request = FriendsRequest;
    type Response = FriendsResponse;
    type Notification = FriendsNotification;
}

/// Outbound friends operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FriendsRequest {
    /// Players whose username matches `query`, excluding the requester.
    SearchPlayers {
        /// Requesting player.
        player_id: PlayerId,
        /// Username fragment.
        query: String,
    },
    /// Accepted friends of the player.
    GetFriends {
        /// Requesting player.
        player_id: PlayerId,
    },
    /// Pending requests addressed to the player.
    GetFriendRequests {
        /// Requesting player.
        player_id: PlayerId,
    },
    /// Ask `receiver_id` to become a friend.
    SendFriendRequest {
        /// Requesting player.
        sender_id: PlayerId,
        /// Addressee.
        receiver_id: PlayerId,
    },
    /// Accept a pending request from `requester_id`.
    AcceptFriendRequest {
        /// Accepting player.
        player_id: PlayerId,
        /// Player that sent the request.
        requester_id: PlayerId,
    },
    /// Decline a pending request from `requester_id`.
    RejectFriendRequest {
        /// Declining player.
        player_id: PlayerId,
        /// Player that sent the request.
        requester_id: PlayerId,
    },
    /// End a friendship.
    RemoveFriend {
        /// Requesting player.
        player_id: PlayerId,
        /// Former friend.
        friend_id: PlayerId,
    },
}

/// Replies of the friends service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FriendsResponse {
    /// Result of a listing query.
    Players(Vec<Player>),
    /// Outcome of a command.
    Reply(ServiceReply),
}

/// Friend notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FriendsNotification {
    /// Someone asked to be friends.
    FriendRequestReceived {
        /// Requesting player.
        sender: Player,
    },
    /// A request sent by this player was accepted.
    FriendRequestAccepted {
        /// New friend.
        friend: Player,
    },
    /// A request sent by this player was declined.
    FriendRequestRejected {
        /// Player that declined.
        player_id: PlayerId,
    },
    /// A friend ended the friendship.
    FriendRemoved {
        /// Former friend.
        player_id: PlayerId,
    },
}

impl ServiceNotification for FriendsNotification {
    fn event_name(&self) -> &'static str {
        match self {
            FriendsNotification::FriendRequestReceived { .. } => "friend_request_received",
            FriendsNotification::FriendRequestAccepted { .. } => "friend_request_accepted",
            FriendsNotification::FriendRequestRejected { .. } => "friend_request_rejected",
            FriendsNotification::FriendRemoved { .. } => "friend_removed",
        }
    }
}

fn players(
    operation: &'static str,
) -> impl FnOnce(FriendsResponse) -> TransportResult<Vec<Player>> + Send {
    move |response| match response {
        FriendsResponse::Players(players) => Ok(players),
        other => Err(TransportError::unexpected_response(operation, &other)),
    }
}

fn reply(
    operation: &'static str,
) -> impl FnOnce(FriendsResponse) -> TransportResult<OperationResult> + Send {
    move |response| match response {
        FriendsResponse::Reply(reply) => Ok(OperationResult::from_reply(reply)),
        other => Err(TransportError::unexpected_response(operation, &other)),
    }
}

/// Proxy for the friends service.
#[derive(Debug, Clone)]
pub struct FriendsProxy {
    connection: DuplexConnection<Friends>,
}

impl FriendsProxy {
    /// Create a proxy; no channel is opened until [`initialize`](Self::initialize).
    pub fn new(factory: Arc<dyn DuplexChannelFactory<Friends>>, config: ProxyConfig) -> Self {
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

    /// Search players by username. Empty on failure or for a blank query.
    pub async fn search_players(&self, query: &str) -> Vec<Player> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let query = query.to_owned();
        self.connection
            .call(
                "SearchPlayers",
                |player_id| FriendsRequest::SearchPlayers {
                    player_id: player_id.clone(),
                    query,
                },
                players("SearchPlayers"),
            )
            .await
            .unwrap_or_default()
    }

    /// Friends of the bound player. Empty on failure.
    pub async fn get_friends(&self) -> Vec<Player> {
        self.connection
            .call(
                "GetFriends",
                |player_id| FriendsRequest::GetFriends {
                    player_id: player_id.clone(),
                },
                players("GetFriends"),
            )
            .await
            .unwrap_or_default()
    }

    /// Players waiting for the bound player to answer their request. Empty on failure.
    pub async fn get_friend_requests(&self) -> Vec<Player> {
        self.connection
            .call(
                "GetFriendRequests",
                |player_id| FriendsRequest::GetFriendRequests {
                    player_id: player_id.clone(),
                },
                players("GetFriendRequests"),
            )
            .await
            .unwrap_or_default()
    }

    /// Ask `receiver_id` to become a friend.
    pub async fn send_friend_request(&self, receiver_id: &PlayerId) -> OperationResult {
        self.command("SendFriendRequest", receiver_id, |sender_id, receiver_id| {
            FriendsRequest::SendFriendRequest {
                sender_id,
                receiver_id,
            }
        })
        .await
    }

    /// Accept the pending request from `requester_id`.
    pub async fn accept_friend_request(&self, requester_id: &PlayerId) -> OperationResult {
        self.command("AcceptFriendRequest", requester_id, |player_id, requester_id| {
            FriendsRequest::AcceptFriendRequest {
                player_id,
                requester_id,
            }
        })
        .await
    }

    /// Decline the pending request from `requester_id`.
    pub async fn reject_friend_request(&self, requester_id: &PlayerId) -> OperationResult {
        self.command("RejectFriendRequest", requester_id, |player_id, requester_id| {
            FriendsRequest::RejectFriendRequest {
                player_id,
                requester_id,
            }
        })
        .await
    }

    /// End the friendship with `friend_id`.
    pub async fn remove_friend(&self, friend_id: &PlayerId) -> OperationResult {
        self.command("RemoveFriend", friend_id, |player_id, friend_id| {
            FriendsRequest::RemoveFriend {
                player_id,
                friend_id,
            }
        })
        .await
    }

    /// Friend notifications.
    pub fn callbacks(&self) -> &CallbackBus<FriendsNotification> {
        self.connection.callbacks()
    }

    /// Current channel state.
    pub async fn state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// Underlying connection.
    pub fn connection(&self) -> &DuplexConnection<Friends> {
        &self.connection
    }

    async fn command<B>(
        &self,
        operation: &'static str,
        other: &PlayerId,
        build: B,
    ) -> OperationResult
    where
        B: FnOnce(PlayerId, PlayerId) -> FriendsRequest + Send,
    {
        if other.is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let other = other.clone();
        settle(
            self.connection
                .call(operation, |player_id| build(player_id.clone(), other), reply(operation))
                .await,
        )
    }
}
