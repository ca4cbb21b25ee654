//! Login and password management.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::settle;
use crate::config::ProxyConfig;
use crate::connection::{OneWayClientFactory, OneWayConnection, OneWayService};
use crate::error::TransportError;
use crate::status::{OperationResult, ServiceReply, StatusCode};
use crate::types::{Player, User};

/// Authentication service contract.
#[derive(Debug, Clone, Copy)]
pub struct Authentication;

impl OneWayService for Authentication {
    const NAME: &'static str = "authentication";
    type Request = AuthenticationRequest;
    type Response = AuthenticationResponse;
}

/// Authentication operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticationRequest {
    /// Check credentials.
    Login(User),
    /// Mail a reset code to `email`.
    BeginPasswordReset {
        /// Account e-mail.
        email: String,
    },
    /// Set a new password using a mailed reset code.
    CompletePasswordReset {
        /// Account e-mail.
        email: String,
        /// Code from the reset mail.
        code: String,
        /// New password.
        new_password: String,
    },
    /// Change the password of a logged-in account.
    UpdatePassword {
        /// Account e-mail.
        email: String,
        /// Password in use.
        current_password: String,
        /// New password.
        new_password: String,
    },
}

/// Replies of the authentication service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticationResponse {
    /// Profile of the authenticated player.
    Player(Player),
    /// Outcome of a command, or the reason a login was refused.
    Reply(ServiceReply),
}

fn reply(
    operation: &'static str,
    response: AuthenticationResponse,
) -> Result<OperationResult, TransportError> {
    match response {
        AuthenticationResponse::Reply(reply) => Ok(OperationResult::from_reply(reply)),
        other => Err(TransportError::unexpected_response(operation, &other)),
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Proxy for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthenticationProxy {
    connection: OneWayConnection<Authentication>,
}

impl AuthenticationProxy {
    /// Create a proxy that opens a client per call through `factory`.
    pub fn new(factory: Arc<dyn OneWayClientFactory<Authentication>>, config: ProxyConfig) -> Self {
        Self {
            connection: OneWayConnection::new(factory, config),
        }
    }

    /// Log in with `user`'s e-mail and password.
    pub async fn login(&self, user: &User) -> OperationResult<Player> {
        if blank(&user.email) || user.password.is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let request = AuthenticationRequest::Login(user.clone());
        settle(
            self.connection
                .call("Login", request, |response| match response {
                    AuthenticationResponse::Player(player) => Ok(OperationResult::success(player)),
                    AuthenticationResponse::Reply(reply) if !reply.is_success => {
                        Ok(OperationResult::failure(reply.status_code))
                    }
                    other => Err(TransportError::unexpected_response("Login", &other)),
                })
                .await,
        )
    }

    /// Start a password reset for `email`.
    pub async fn begin_password_reset(&self, email: &str) -> OperationResult {
        if blank(email) {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let request = AuthenticationRequest::BeginPasswordReset {
            email: email.to_owned(),
        };
        settle(
            self.connection
                .call("BeginPasswordReset", request, |response| {
                    reply("BeginPasswordReset", response)
                })
                .await,
        )
    }

    /// Finish a password reset with the mailed `code`.
    pub async fn complete_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> OperationResult {
        if blank(email) || blank(code) || new_password.is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let request = AuthenticationRequest::CompletePasswordReset {
            email: email.to_owned(),
            code: code.to_owned(),
            new_password: new_password.to_owned(),
        };
        settle(
            self.connection
                .call("CompletePasswordReset", request, |response| {
                    reply("CompletePasswordReset", response)
                })
                .await,
        )
    }

    /// Change the password of `email` from `current_password` to `new_password`.
    pub async fn update_password(
        &self,
        email: &str,
        current_password: &str,
        new_password: &str,
    ) -> OperationResult {
        if blank(email) || current_password.is_empty() || new_password.is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let request = AuthenticationRequest::UpdatePassword {
            email: email.to_owned(),
            current_password: current_password.to_owned(),
            new_password: new_password.to_owned(),
        };
        settle(
            self.connection
                .call("UpdatePassword", request, |response| reply("UpdatePassword", response))
                .await,
        )
    }
}
