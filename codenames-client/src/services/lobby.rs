//! Two-player lobbies.
//!
//! A host creates a party and shares its [`LobbyCode`]; a guest joins with
//! the code, either typed in or received through
//! [`LobbyNotification::InvitationReceived`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::settle;
use crate::callbacks::{CallbackBus, ServiceNotification};
use crate::config::{CallbackConcurrency, ProxyConfig};
use crate::connection::{ConnectionState, DuplexChannelFactory, DuplexConnection, DuplexService};
use crate::error::TransportError;
use crate::status::{OperationResult, ServiceReply, StatusCode};
use crate::types::{LobbyCode, Party, Player, PlayerId};

/// Lobby service contract.
#[derive(Debug, Clone, Copy)]
pub struct Lobby;

impl DuplexService for Lobby {
    const NAME: &'static str = "lobby";
    const CALLBACK_CONCURRENCY: CallbackConcurrency = CallbackConcurrency::Reentrant;
    type Request = LobbyRequest;
    type Response = LobbyResponse;
    type Notification = LobbyNotification;
}

/// Outbound lobby operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LobbyRequest {
    /// Open a party hosted by `host`.
    CreateParty {
        /// Hosting player.
        host: Player,
    },
    /// Invite a friend into the host's party.
    InviteToParty {
        /// Host sending the invitation.
        sender_id: PlayerId,
        /// Invited player.
        receiver_id: PlayerId,
        /// Party to join.
        lobby_code: LobbyCode,
    },
    /// Join the party identified by `lobby_code`.
    JoinParty {
        /// Joining player.
        guest: Player,
        /// Party to join.
        lobby_code: LobbyCode,
    },
    /// Leave a party, closing it if the host leaves.
    LeaveParty {
        /// Leaving player.
        player_id: PlayerId,
        /// Party to leave.
        lobby_code: LobbyCode,
    },
}

/// Replies of the lobby service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LobbyResponse {
    /// The party after the operation.
    Party(Party),
    /// Outcome of a command, or the reason a party operation was refused.
    Reply(ServiceReply),
}

/// Lobby notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LobbyNotification {
    /// A friend invited this player.
    InvitationReceived {
        /// Inviting host.
        host: Player,
        /// Party to join.
        lobby_code: LobbyCode,
    },
    /// A guest joined the hosted party.
    GuestJoined {
        /// Joining player.
        guest: Player,
    },
    /// The guest left the hosted party.
    GuestLeft {
        /// Leaving player.
        player_id: PlayerId,
    },
    /// The host left; the party is closed.
    HostLeft {
        /// Closed party.
        lobby_code: LobbyCode,
    },
}

impl ServiceNotification for LobbyNotification {
    fn event_name(&self) -> &'static str {
        match self {
            LobbyNotification::InvitationReceived { .. } => "invitation_received",
            LobbyNotification::GuestJoined { .. } => "guest_joined",
            LobbyNotification::GuestLeft { .. } => "guest_left",
            LobbyNotification::HostLeft { .. } => "host_left",
        }
    }
}

/// Decode a party reply. A refusal is the server's verdict, not a transport failure.
fn party(
    operation: &'static str,
    response: LobbyResponse,
) -> Result<OperationResult<Party>, TransportError> {
    match response {
        LobbyResponse::Party(party) => Ok(OperationResult::success(party)),
        LobbyResponse::Reply(reply) if !reply.is_success => {
            Ok(OperationResult::failure(reply.status_code))
        }
        other => Err(TransportError::unexpected_response(operation, &other)),
    }
}

/// Proxy for the lobby service.
#[derive(Debug, Clone)]
pub struct LobbyProxy {
    connection: DuplexConnection<Lobby>,
}

impl LobbyProxy {
    /// Create a proxy; no channel is opened until [`initialize`](Self::initialize).
    pub fn new(factory: Arc<dyn DuplexChannelFactory<Lobby>>, config: ProxyConfig) -> Self {
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

    /// Create a party hosted by `host`.
    pub async fn create_lobby(&self, host: &Player) -> OperationResult<Party> {
        if host.player_id.is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let host = host.clone();
        settle(
            self.connection
                .call(
                    "CreateParty",
                    move |_| LobbyRequest::CreateParty { host },
                    |response| party("CreateParty", response),
                )
                .await,
        )
    }

    /// Invite `receiver_id` into the party `lobby_code`.
    pub async fn invite_to_party(
        &self,
        receiver_id: &PlayerId,
        lobby_code: &LobbyCode,
    ) -> OperationResult {
        if receiver_id.is_empty() || lobby_code.is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let receiver_id = receiver_id.clone();
        let lobby_code = lobby_code.clone();
        settle(
            self.connection
                .call(
                    "InviteToParty",
                    move |sender_id| LobbyRequest::InviteToParty {
                        sender_id: sender_id.clone(),
                        receiver_id,
                        lobby_code,
                    },
                    |response| match response {
                        LobbyResponse::Reply(reply) => Ok(OperationResult::from_reply(reply)),
                        other => Err(TransportError::unexpected_response("InviteToParty", &other)),
                    },
                )
                .await,
        )
    }

    /// Join the party `lobby_code` as `guest`.
    pub async fn join_party(
        &self,
        guest: &Player,
        lobby_code: &LobbyCode,
    ) -> OperationResult<Party> {
        if guest.player_id.is_empty() || lobby_code.is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let guest = guest.clone();
        let lobby_code = lobby_code.clone();
        settle(
            self.connection
                .call(
                    "JoinParty",
                    move |_| LobbyRequest::JoinParty { guest, lobby_code },
                    |response| party("JoinParty", response),
                )
                .await,
        )
    }

    /// Leave the party `lobby_code`.
    pub async fn leave_party(&self, lobby_code: &LobbyCode) -> OperationResult {
        if lobby_code.is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let lobby_code = lobby_code.clone();
        settle(
            self.connection
                .call(
                    "LeaveParty",
                    move |player_id| LobbyRequest::LeaveParty {
                        player_id: player_id.clone(),
                        lobby_code,
                    },
                    |response| match response {
                        LobbyResponse::Reply(reply) => Ok(OperationResult::from_reply(reply)),
                        other => Err(TransportError::unexpected_response("LeaveParty", &other)),
                    },
                )
                .await,
        )
    }

    /// Lobby notifications.
    pub fn callbacks(&self) -> &CallbackBus<LobbyNotification> {
        self.connection.callbacks()
    }

    /// Current channel state.
    pub async fn state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// Underlying connection.
    pub fn connection(&self) -> &DuplexConnection<Lobby> {
        &self.connection
    }
}
