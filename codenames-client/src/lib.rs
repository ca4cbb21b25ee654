//! # Codenames Client
//!
//! Resilient RPC client layer for the Codenames multiplayer game.
//!
//! This crate provides:
//! - **Status taxonomy**: every remote call ends in a typed [`OperationResult`]
//!   whose [`StatusCode`] is derived from transport failures by a pure mapping
//! - **Duplex proxies**: long-lived channels to session, friends, lobby,
//!   matchmaking, gameplay and scoreboard, with reconnect-on-demand and
//!   server-pushed notifications
//! - **One-way proxies**: authentication, users, e-mail and moderation, with a
//!   fresh client per call
//! - **Callback bus**: typed publish/subscribe for push notifications
//!
//! The wire binding is external: applications implement
//! [`DuplexChannelFactory`] and [`OneWayClientFactory`] for each service and
//! hand them to a [`GameClient`].

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// =============================================================================
// Modules
// =============================================================================

/// Push notification plumbing.
pub mod callbacks;

/// Composition root.
pub mod client;

/// Proxy configuration.
pub mod config;

/// Channel lifecycle and connection managers.
pub mod connection;

/// Error types.
pub mod error;

/// Service proxies.
pub mod services;

/// Result taxonomy.
pub mod status;

/// Scripted transports for tests.
pub mod testing;

/// Identifiers and payloads.
pub mod types;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use callbacks::{CallbackBus, CallbackSink, ServiceNotification, SubscriptionId};
pub use client::{ClientTransports, GameClient};
pub use config::{CallbackConcurrency, ClientConfig, ProxyConfig};
pub use connection::{
    Closable, CloseOutcome, ConnectionState, DuplexChannel, DuplexChannelFactory, DuplexConnection,
    DuplexService, OneWayClient, OneWayClientFactory, OneWayConnection, OneWayService, safe_close,
};
pub use error::{ConfigError, TransportError, TransportResult};
pub use services::{
    AuthenticationProxy, EmailProxy, FriendsProxy, GameplayProxy, LobbyProxy, MatchmakingProxy,
    ModerationProxy, ScoreboardProxy, SessionProxy, UsersProxy,
};
pub use status::{FailureKind, OperationResult, ServiceReply, StatusCode, classify};
pub use types::{
    BoardCoordinates, Clue, KickReason, LobbyCode, Match, MatchId, MatchRequest, MatchRole, Party,
    PickedCard, Player, PlayerId, PlayerReport, ScoreRecord, User, UserId,
};
