//! Composition root owning one proxy per service.
//!
//! Proxies are created once per [`GameClient`] and live as long as it does.
//! [`login`](GameClient::login) opens the channels a logged-in player always
//! needs; lobby, matchmaking and gameplay are opened by the screens that use
//! them. [`logout`](GameClient::logout) closes everything.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::connection::{DuplexChannelFactory, OneWayClientFactory};
use crate::error::ConfigError;
use crate::services::authentication::Authentication;
use crate::services::email::Email;
use crate::services::friends::Friends;
use crate::services::gameplay::Gameplay;
use crate::services::lobby::Lobby;
use crate::services::matchmaking::Matchmaking;
use crate::services::moderation::Moderation;
use crate::services::scoreboard::Scoreboard;
use crate::services::session::Session;
use crate::services::users::Users;
use crate::services::{
    AuthenticationProxy, EmailProxy, FriendsProxy, GameplayProxy, LobbyProxy, MatchmakingProxy,
    ModerationProxy, ScoreboardProxy, SessionProxy, UsersProxy,
};
use crate::status::OperationResult;
use crate::types::PlayerId;

/// Transport bindings for every service.
#[derive(Clone)]
pub struct ClientTransports {
    /// Session channels.
    pub session: Arc<dyn DuplexChannelFactory<Session>>,
    /// Friends channels.
    pub friends: Arc<dyn DuplexChannelFactory<Friends>>,
    /// Lobby channels.
    pub lobby: Arc<dyn DuplexChannelFactory<Lobby>>,
    /// Matchmaking channels.
    pub matchmaking: Arc<dyn DuplexChannelFactory<Matchmaking>>,
    /// Gameplay channels.
    pub gameplay: Arc<dyn DuplexChannelFactory<Gameplay>>,
    /// Scoreboard channels.
    pub scoreboard: Arc<dyn DuplexChannelFactory<Scoreboard>>,
    /// Authentication clients.
    pub authentication: Arc<dyn OneWayClientFactory<Authentication>>,
    /// User service clients.
    pub users: Arc<dyn OneWayClientFactory<Users>>,
    /// E-mail clients.
    pub email: Arc<dyn OneWayClientFactory<Email>>,
    /// Moderation clients.
    pub moderation: Arc<dyn OneWayClientFactory<Moderation>>,
}

/// Every service proxy of a game client.
#[derive(Debug, Clone)]
pub struct GameClient {
    session: SessionProxy,
    friends: FriendsProxy,
    lobby: LobbyProxy,
    matchmaking: MatchmakingProxy,
    gameplay: GameplayProxy,
    scoreboard: ScoreboardProxy,
    authentication: AuthenticationProxy,
    users: UsersProxy,
    email: EmailProxy,
    moderation: ModerationProxy,
}

impl GameClient {
    /// Build the proxies. No channel is opened.
    pub fn new(transports: ClientTransports, config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            session: SessionProxy::new(transports.session, config.session),
            friends: FriendsProxy::new(transports.friends, config.friends),
            lobby: LobbyProxy::new(transports.lobby, config.lobby),
            matchmaking: MatchmakingProxy::new(transports.matchmaking, config.matchmaking),
            gameplay: GameplayProxy::new(transports.gameplay, config.gameplay),
            scoreboard: ScoreboardProxy::new(transports.scoreboard, config.scoreboard),
            authentication: AuthenticationProxy::new(
                transports.authentication,
                config.one_way.clone(),
            ),
            users: UsersProxy::new(transports.users, config.one_way.clone()),
            email: EmailProxy::new(transports.email, config.one_way.clone()),
            moderation: ModerationProxy::new(transports.moderation, config.one_way),
        })
    }

    /// Open the session, friends and scoreboard channels for `player_id`.
    ///
    /// Stops at the first failure, closes whatever was opened and returns
    /// that failure.
    pub async fn login(&self, player_id: &PlayerId) -> OperationResult {
        let result = self.session.initialize(player_id).await;
        if !result.is_success() {
            return result;
        }
        let result = self.friends.initialize(player_id).await;
        if !result.is_success() {
            self.session.disconnect().await;
            return result;
        }
        let result = self.scoreboard.subscribe_to_scoreboard_updates(player_id).await;
        if !result.is_success() {
            self.friends.disconnect().await;
            self.session.disconnect().await;
            return result;
        }
        tracing::info!(%player_id, "logged in");
        result
    }

    /// Close every duplex channel.
    pub async fn logout(&self) {
        tokio::join!(
            self.gameplay.disconnect(),
            self.matchmaking.disconnect(),
            self.lobby.disconnect(),
            self.scoreboard.disconnect(),
            self.friends.disconnect(),
            self.session.disconnect(),
        );
        tracing::info!("logged out");
    }

    /// Session proxy.
    pub fn session(&self) -> &SessionProxy {
        &self.session
    }

    /// Friends proxy.
    pub fn friends(&self) -> &FriendsProxy {
        &self.friends
    }

    /// Lobby proxy.
    pub fn lobby(&self) -> &LobbyProxy {
        &self.lobby
    }

    /// Matchmaking proxy.
    pub fn matchmaking(&self) -> &MatchmakingProxy {
        &self.matchmaking
    }

    /// Gameplay proxy.
    pub fn gameplay(&self) -> &GameplayProxy {
        &self.gameplay
    }

    /// Scoreboard proxy.
    pub fn scoreboard(&self) -> &ScoreboardProxy {
        &self.scoreboard
    }

    /// Authentication proxy.
    pub fn authentication(&self) -> &AuthenticationProxy {
        &self.authentication
    }

    /// User service proxy.
    pub fn users(&self) -> &UsersProxy {
        &self.users
    }

    /// E-mail proxy.
    pub fn email(&self) -> &EmailProxy {
        &self.email
    }

    /// Moderation proxy.
    pub fn moderation(&self) -> &ModerationProxy {
        &self.moderation
    }
}
