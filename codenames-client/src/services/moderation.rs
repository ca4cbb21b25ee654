//! Player reports.
//!
//! Unlike the other services, a failure the taxonomy does not recognize is
//! reported as `ServerError`: the report may have reached the server.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::settle;
use crate::config::ProxyConfig;
use crate::connection::{OneWayClientFactory, OneWayConnection, OneWayService};
use crate::status::{OperationResult, ServiceReply, StatusCode};
use crate::types::PlayerReport;

/// Moderation service contract.
#[derive(Debug, Clone, Copy)]
pub struct Moderation;

impl OneWayService for Moderation {
    const NAME: &'static str = "moderation";
    const UNEXPECTED_FAILURE: StatusCode = StatusCode::ServerError;
    type Request = ModerationRequest;
    type Response = ServiceReply;
}

/// Moderation operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModerationRequest {
    /// File a report.
    ReportPlayer(PlayerReport),
}

/// Proxy for the moderation service.
#[derive(Debug, Clone)]
pub struct ModerationProxy {
    connection: OneWayConnection<Moderation>,
}

impl ModerationProxy {
    /// Create a proxy that opens a client per call through `factory`.
    pub fn new(factory: Arc<dyn OneWayClientFactory<Moderation>>, config: ProxyConfig) -> Self {
        Self {
            connection: OneWayConnection::new(factory, config),
        }
    }

    /// File `report`. Reporting oneself is refused locally with `Unauthorized`.
    pub async fn report_player(&self, report: &PlayerReport) -> OperationResult {
        if report.reporter.is_empty()
            || report.reported.is_empty()
            || report.reason.trim().is_empty()
        {
            return OperationResult::failure(StatusCode::MissingData);
        }
        if report.reporter == report.reported {
            return OperationResult::failure(StatusCode::Unauthorized);
        }
        settle(
            self.connection
                .call(
                    "ReportPlayer",
                    ModerationRequest::ReportPlayer(report.clone()),
                    |reply| Ok(OperationResult::from_reply(reply)),
                )
                .await,
        )
    }
}
