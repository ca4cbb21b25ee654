//! Identifiers and payload records exchanged with the game services.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is empty or whitespace only.
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Player identity bound to duplex channels.
    PlayerId
);

string_id!(
    /// Account identifier owned by the user service.
    UserId
);

string_id!(
    /// Identifier of an arranged match.
    MatchId
);

string_id!(
    /// Code guests use to join a lobby.
    LobbyCode
);

/// Public profile of a player.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Player {
    /// Player identity.
    pub player_id: PlayerId,
    /// Owning account.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// First name.
    pub name: String,
    /// Last name.
    pub last_name: String,
    /// Selected avatar.
    pub avatar_id: u32,
    /// Free-form profile text.
    pub description: String,
}

impl Player {
    /// Minimal profile with an id and a username.
    pub fn new(player_id: impl Into<PlayerId>, username: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            username: username.into(),
            ..Self::default()
        }
    }
}

/// Account credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account identifier, empty before registration.
    pub user_id: UserId,
    /// Login e-mail.
    pub email: String,
    /// Password as typed by the player.
    pub password: String,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A two-player lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Player that created the lobby.
    pub host: Player,
    /// Player that joined, if any.
    pub guest: Option<Player>,
    /// Code used to join.
    pub lobby_code: LobbyCode,
}

/// Request to arrange a match between lobby members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    /// Player asking for the match.
    pub requester: PlayerId,
    /// Partner in the lobby.
    pub companion: PlayerId,
}

/// Match arranged by the matchmaking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Match identifier.
    pub match_id: MatchId,
    /// Player that requested the match.
    pub requester: Player,
    /// Partner.
    pub companion: Player,
    /// Seconds per turn.
    pub turn_timer_secs: u32,
}

/// Role a player holds during a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchRole {
    /// Gives clues.
    SpyMaster,
    /// Guesses from clues.
    Agent,
}

impl MatchRole {
    /// The role the partner holds.
    pub fn partner(self) -> Self {
        match self {
            MatchRole::SpyMaster => MatchRole::Agent,
            MatchRole::Agent => MatchRole::SpyMaster,
        }
    }
}

/// Clue given by the spy master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    /// Clue word.
    pub word: String,
    /// Number of board cards the clue relates to.
    pub count: u8,
}

/// Position of a card on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardCoordinates {
    /// Zero-based row.
    pub row: u8,
    /// Zero-based column.
    pub column: u8,
}

/// A card pick reported to the partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickedCard {
    /// Player that picked.
    pub player_id: PlayerId,
    /// Match the pick belongs to.
    pub match_id: MatchId,
    /// Picked card.
    pub coordinates: BoardCoordinates,
    /// Remaining seconds on the turn timer after the pick.
    pub remaining_secs: u32,
}

/// Leaderboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Player the score belongs to.
    pub player_id: PlayerId,
    /// Display name.
    pub username: String,
    /// Matches won.
    pub games_won: u32,
    /// Matches played.
    pub games_played: u32,
    /// Fastest win, in seconds.
    pub fastest_match_secs: Option<u32>,
}

/// Report of a misbehaving player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerReport {
    /// Player filing the report.
    pub reporter: PlayerId,
    /// Player being reported.
    pub reported: PlayerId,
    /// Reason given by the reporter.
    pub reason: String,
}

/// Why the server ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KickReason {
    /// The account accumulated enough reports to be banned.
    Banned,
    /// The same player logged in elsewhere.
    DuplicateLogin,
    /// The server is shutting down.
    ServerShutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_ids_are_empty() {
        assert!(PlayerId::default().is_empty());
        assert!(PlayerId::from("   ").is_empty());
        assert!(!PlayerId::from("p-1").is_empty());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&LobbyCode::from("ABC123")).expect("serialize");
        assert_eq!(json, "\"ABC123\"");
    }

    #[test]
    fn test_user_debug_redacts_password() {
        let user = User {
            user_id: UserId::from("u-1"),
            email: "agent@example.com".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("agent@example.com"));
    }

    #[test]
    fn test_partner_role() {
        assert_eq!(MatchRole::SpyMaster.partner(), MatchRole::Agent);
        assert_eq!(MatchRole::Agent.partner(), MatchRole::SpyMaster);
    }
}
