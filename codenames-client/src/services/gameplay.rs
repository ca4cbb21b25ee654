//! In-match events.
//!
//! Every outbound operation is fire-and-forget: the caller learns nothing
//! about delivery. A failed send closes the channel like any other failure,
//! and the next operation reconnects through the state guard.
//!
//! The `*_detached` variants return immediately and run the send on a
//! spawned task.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::callbacks::{CallbackBus, ServiceNotification};
use crate::config::{CallbackConcurrency, ProxyConfig};
use crate::connection::{ConnectionState, DuplexChannelFactory, DuplexConnection, DuplexService};
use crate::status::OperationResult;
use crate::types::{Clue, MatchId, MatchRole, PickedCard, PlayerId};

/// Gameplay service contract.
#[derive(Debug, Clone, Copy)]
pub struct Gameplay;

impl DuplexService for Gameplay {
    const NAME: &'static str = "gameplay";
    const CALLBACK_CONCURRENCY: CallbackConcurrency = CallbackConcurrency::Concurrent;
    type Request = GameplayRequest;
    type Response = ();
    type Notification = GameplayNotification;
}

/// Outbound in-match events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameplayRequest {
    /// The spy master gives a clue.
    SendClue {
        /// Spy master.
        sender_id: PlayerId,
        /// Running match.
        match_id: MatchId,
        /// The clue.
        clue: Clue,
    },
    /// The turn timer of `role` ran out.
    NotifyTurnTimeout {
        /// Player whose timer ran out.
        player_id: PlayerId,
        /// Running match.
        match_id: MatchId,
        /// Role that held the turn.
        role: MatchRole,
    },
    /// An agent card was picked.
    NotifyPickedAgent(PickedCard),
    /// A bystander card was picked.
    NotifyPickedBystander(PickedCard),
    /// The assassin card was picked; the match is lost.
    NotifyPickedAssassin(PickedCard),
}

/// In-match notifications from the partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameplayNotification {
    /// The spy master gave a clue.
    ClueReceived(Clue),
    /// The partner's turn timer ran out.
    TurnTimedOut {
        /// Role whose timer ran out.
        role: MatchRole,
    },
    /// Roles swapped for the next turn.
    RolesChanged {
        /// Role this player now holds.
        role: MatchRole,
    },
    /// The partner picked an agent.
    AgentPicked(PickedCard),
    /// The partner picked a bystander.
    BystanderPicked(PickedCard),
    /// The partner picked the assassin.
    AssassinPicked(PickedCard),
    /// The partner left the match.
    PartnerLeft {
        /// Partner that left.
        player_id: PlayerId,
    },
}

impl ServiceNotification for GameplayNotification {
    fn event_name(&self) -> &'static str {
        match self {
            GameplayNotification::ClueReceived(_) => "clue_received",
            GameplayNotification::TurnTimedOut { .. } => "turn_timed_out",
            GameplayNotification::RolesChanged { .. } => "roles_changed",
            GameplayNotification::AgentPicked(_) => "agent_picked",
            GameplayNotification::BystanderPicked(_) => "bystander_picked",
            GameplayNotification::AssassinPicked(_) => "assassin_picked",
            GameplayNotification::PartnerLeft { .. } => "partner_left",
        }
    }
}

/// Proxy for the gameplay service.
#[derive(Debug, Clone)]
pub struct GameplayProxy {
    connection: DuplexConnection<Gameplay>,
}

impl GameplayProxy {
    /// Create a proxy; no channel is opened until [`initialize`](Self::initialize).
    pub fn new(factory: Arc<dyn DuplexChannelFactory<Gameplay>>, config: ProxyConfig) -> Self {
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

    /// Give `clue` to the partner.
    pub async fn send_clue(&self, match_id: MatchId, clue: Clue) {
        self.fire("SendClue", move |sender_id| GameplayRequest::SendClue {
            sender_id: sender_id.clone(),
            match_id,
            clue,
        })
        .await
    }

    /// Report that the turn timer of `role` ran out.
    pub async fn notify_turn_timeout(&self, match_id: MatchId, role: MatchRole) {
        self.fire("NotifyTurnTimeout", move |player_id| GameplayRequest::NotifyTurnTimeout {
            player_id: player_id.clone(),
            match_id,
            role,
        })
        .await
    }

    /// Report an agent pick.
    pub async fn notify_picked_agent(&self, card: PickedCard) {
        self.fire("NotifyPickedAgent", move |_| GameplayRequest::NotifyPickedAgent(card))
            .await
    }

    /// Report a bystander pick.
    pub async fn notify_picked_bystander(&self, card: PickedCard) {
        self.fire("NotifyPickedBystander", move |_| {
            GameplayRequest::NotifyPickedBystander(card)
        })
        .await
    }

    /// Report an assassin pick.
    pub async fn notify_picked_assassin(&self, card: PickedCard) {
        self.fire("NotifyPickedAssassin", move |_| {
            GameplayRequest::NotifyPickedAssassin(card)
        })
        .await
    }

    /// [`send_clue`](Self::send_clue) on a spawned task.
    pub fn send_clue_detached(&self, match_id: MatchId, clue: Clue) -> JoinHandle<()> {
        let proxy = self.clone();
        tokio::spawn(async move { proxy.send_clue(match_id, clue).await })
    }

    /// [`notify_turn_timeout`](Self::notify_turn_timeout) on a spawned task.
    pub fn notify_turn_timeout_detached(
        &self,
        match_id: MatchId,
        role: MatchRole,
    ) -> JoinHandle<()> {
        let proxy = self.clone();
        tokio::spawn(async move { proxy.notify_turn_timeout(match_id, role).await })
    }

    /// [`notify_picked_agent`](Self::notify_picked_agent) on a spawned task.
    pub fn notify_picked_agent_detached(&self, card: PickedCard) -> JoinHandle<()> {
        let proxy = self.clone();
        tokio::spawn(async move { proxy.notify_picked_agent(card).await })
    }

    /// [`notify_picked_bystander`](Self::notify_picked_bystander) on a spawned task.
    pub fn notify_picked_bystander_detached(&self, card: PickedCard) -> JoinHandle<()> {
        let proxy = self.clone();
        tokio::spawn(async move { proxy.notify_picked_bystander(card).await })
    }

    /// [`notify_picked_assassin`](Self::notify_picked_assassin) on a spawned task.
    pub fn notify_picked_assassin_detached(&self, card: PickedCard) -> JoinHandle<()> {
        let proxy = self.clone();
        tokio::spawn(async move { proxy.notify_picked_assassin(card).await })
    }

    /// In-match notifications.
    pub fn callbacks(&self) -> &CallbackBus<GameplayNotification> {
        self.connection.callbacks()
    }

    /// Current channel state.
    pub async fn state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// Underlying connection.
    pub fn connection(&self) -> &DuplexConnection<Gameplay> {
        &self.connection
    }

    async fn fire<B>(&self, operation: &'static str, build: B)
    where
        B: FnOnce(&PlayerId) -> GameplayRequest + Send,
    {
        if let Err(status) = self.connection.send(operation, build).await {
            tracing::debug!(service = Gameplay::NAME, operation, %status, "event not delivered");
        }
    }
}
