//! Typed proxies for every game service.
//!
//! Duplex services keep a channel open per logged-in player and push
//! notifications back through their [`CallbackBus`](crate::CallbackBus).
//! One-way services open a fresh client for every call.
//!
//! # Callback discipline
//!
//! | Service      | Kind    | Callbacks    |
//! |--------------|---------|--------------|
//! | session      | duplex  | reentrant    |
//! | friends      | duplex  | reentrant    |
//! | lobby        | duplex  | reentrant    |
//! | matchmaking  | duplex  | concurrent   |
//! | gameplay     | duplex  | concurrent   |
//! | scoreboard   | duplex  | concurrent   |
//! | authentication, users, email, moderation | one-way | none |
//!
//! Reentrant services deliver one notification at a time in arrival order;
//! a listener may call back into the owning proxy from a spawned task.
//! Concurrent services publish every notification on its own task, so
//! listeners must tolerate running in parallel and out of order.
//!
//! No proxy operation returns an error: failures are reported through the
//! [`StatusCode`](crate::StatusCode) of an
//! [`OperationResult`](crate::OperationResult), or as an empty value for
//! queries.

pub mod authentication;
pub mod email;
pub mod friends;
pub mod gameplay;
pub mod lobby;
pub mod matchmaking;
pub mod moderation;
pub mod scoreboard;
pub mod session;
pub mod users;

pub use authentication::AuthenticationProxy;
pub use email::EmailProxy;
pub use friends::FriendsProxy;
pub use gameplay::GameplayProxy;
pub use lobby::LobbyProxy;
pub use matchmaking::MatchmakingProxy;
pub use moderation::ModerationProxy;
pub use scoreboard::ScoreboardProxy;
pub use session::SessionProxy;
pub use users::UsersProxy;

use crate::status::{OperationResult, StatusCode};

/// Merge a transport-level outcome with the server's own verdict.
pub(crate) fn settle<T>(outcome: Result<OperationResult<T>, StatusCode>) -> OperationResult<T> {
    match outcome {
        Ok(result) => result,
        Err(code) => OperationResult::failure(code),
    }
}
