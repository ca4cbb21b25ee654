//! Account registration and player profiles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::settle;
use crate::config::ProxyConfig;
use crate::connection::{OneWayClientFactory, OneWayConnection, OneWayService};
use crate::error::TransportError;
use crate::status::{OperationResult, ServiceReply, StatusCode};
use crate::types::{Player, User, UserId};

/// User service contract.
#[derive(Debug, Clone, Copy)]
pub struct Users;

impl OneWayService for Users {
    const NAME: &'static str = "users";
    type Request = UsersRequest;
    type Response = UsersResponse;
}

/// User service operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsersRequest {
    /// Register an account together with its player profile.
    SignIn {
        /// Credentials.
        user: User,
        /// Initial profile.
        player: Player,
    },
    /// Profile owned by `user_id`.
    GetPlayerByUserId {
        /// Account identifier.
        user_id: UserId,
    },
    /// Replace the editable fields of a profile.
    UpdateProfile(Player),
}

/// Replies of the user service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsersResponse {
    /// Profile lookup; `None` if the account has no profile.
    Player(Option<Player>),
    /// Outcome of a command.
    Reply(ServiceReply),
}

/// Proxy for the user service.
#[derive(Debug, Clone)]
pub struct UsersProxy {
    connection: OneWayConnection<Users>,
}

impl UsersProxy {
    /// Create a proxy that opens a client per call through `factory`.
    pub fn new(factory: Arc<dyn OneWayClientFactory<Users>>, config: ProxyConfig) -> Self {
        Self {
            connection: OneWayConnection::new(factory, config),
        }
    }

    /// Register `user` with the initial profile `player`.
    pub async fn sign_in(&self, user: &User, player: &Player) -> OperationResult {
        if user.email.trim().is_empty()
            || user.password.is_empty()
            || player.username.trim().is_empty()
        {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let request = UsersRequest::SignIn {
            user: user.clone(),
            player: player.clone(),
        };
        settle(self.connection.call("SignIn", request, |response| reply("SignIn", response)).await)
    }

    /// Profile owned by `user_id`. `None` on failure or if there is none.
    pub async fn get_player_by_user_id(&self, user_id: &UserId) -> Option<Player> {
        if user_id.is_empty() {
            return None;
        }
        let request = UsersRequest::GetPlayerByUserId {
            user_id: user_id.clone(),
        };
        self.connection
            .call("GetPlayerByUserId", request, |response| match response {
                UsersResponse::Player(player) => Ok(player),
                other => Err(TransportError::unexpected_response("GetPlayerByUserId", &other)),
            })
            .await
            .ok()
            .flatten()
    }

    /// Save the editable fields of `player`.
    pub async fn update_profile(&self, player: &Player) -> OperationResult {
        if player.player_id.is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let request = UsersRequest::UpdateProfile(player.clone());
        settle(
            self.connection
                .call("UpdateProfile", request, |response| reply("UpdateProfile", response))
                .await,
        )
    }
}

fn reply(
    operation: &'static str,
    response: UsersResponse,
) -> Result<OperationResult, TransportError> {
    match response {
        UsersResponse::Reply(reply) => Ok(OperationResult::from_reply(reply)),
        other => Err(TransportError::unexpected_response(operation, &other)),
    }
}
