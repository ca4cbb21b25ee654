//! E-mail verification codes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::settle;
use crate::config::ProxyConfig;
use crate::connection::{OneWayClientFactory, OneWayConnection, OneWayService};
use crate::status::{OperationResult, ServiceReply, StatusCode};

/// E-mail service contract.
#[derive(Debug, Clone, Copy)]
pub struct Email;

impl OneWayService for Email {
    const NAME: &'static str = "email";
    type Request = EmailRequest;
    type Response = ServiceReply;
}

/// E-mail service operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailRequest {
    /// Mail a fresh verification code to `email`.
    SendVerificationCode {
        /// Address to verify.
        email: String,
    },
    /// Check a code previously mailed to `email`.
    ValidateVerificationCode {
        /// Address being verified.
        email: String,
        /// Code typed by the player.
        code: String,
    },
}

/// Proxy for the e-mail service.
#[derive(Debug, Clone)]
pub struct EmailProxy {
    connection: OneWayConnection<Email>,
}

impl EmailProxy {
    /// Create a proxy that opens a client per call through `factory`.
    pub fn new(factory: Arc<dyn OneWayClientFactory<Email>>, config: ProxyConfig) -> Self {
        Self {
            connection: OneWayConnection::new(factory, config),
        }
    }

    /// Mail a verification code to `email`.
    pub async fn send_verification_code(&self, email: &str) -> OperationResult {
        if email.trim().is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let request = EmailRequest::SendVerificationCode {
            email: email.to_owned(),
        };
        self.command("SendVerificationCode", request).await
    }

    /// Check `code` against the one mailed to `email`.
    pub async fn validate_verification_code(&self, email: &str, code: &str) -> OperationResult {
        if email.trim().is_empty() || code.trim().is_empty() {
            return OperationResult::failure(StatusCode::MissingData);
        }
        let request = EmailRequest::ValidateVerificationCode {
            email: email.to_owned(),
            code: code.trim().to_owned(),
        };
        self.command("ValidateVerificationCode", request).await
    }

    async fn command(&self, operation: &'static str, request: EmailRequest) -> OperationResult {
        settle(
            self.connection
                .call(operation, request, |reply| Ok(OperationResult::from_reply(reply)))
                .await,
        )
    }
}
