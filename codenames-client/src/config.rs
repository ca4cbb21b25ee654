//! Configuration structures for proxy behavior.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How inbound callbacks of a duplex service are dispatched.
///
/// This decides whether a callback listener may run alongside another one
/// from the same channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackConcurrency {
    /// One callback at a time, in arrival order. Listeners may call back
    /// into the owning proxy (by spawning), since dispatch holds no proxy lock.
    Reentrant,
    /// Every callback is published on its own task; listeners of the same
    /// service may run in parallel.
    Concurrent,
}

/// Configuration for a single proxy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Deadline for opening a channel.
    #[serde(rename = "open_timeout_ms", with = "duration_ms")]
    pub open_timeout: Duration,

    /// Deadline for a single remote operation, `Connect` included.
    #[serde(rename = "operation_timeout_ms", with = "duration_ms")]
    pub operation_timeout: Duration,

    /// Deadline for a graceful close before the channel is aborted.
    #[serde(rename = "close_timeout_ms", with = "duration_ms")]
    pub close_timeout: Duration,

    /// Capacity of the broadcast stream handed to async subscribers.
    pub callback_buffer: usize,

    /// Overrides the service's default callback dispatch discipline.
    pub callback_concurrency: Option<CallbackConcurrency>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(30),
            close_timeout: Duration::from_secs(5),
            callback_buffer: 256,
            callback_concurrency: None,
        }
    }
}

impl ProxyConfig {
    /// Configuration for a server on the local network.
    pub fn local_network() -> Self {
        Self {
            open_timeout: Duration::from_millis(500),
            operation_timeout: Duration::from_secs(2),
            close_timeout: Duration::from_millis(250),
            callback_buffer: 64,
            callback_concurrency: None,
        }
    }

    /// Configuration for a server reached over a high-latency WAN.
    pub fn wan_network() -> Self {
        Self {
            open_timeout: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(60),
            close_timeout: Duration::from_secs(10),
            callback_buffer: 1024,
            callback_concurrency: None,
        }
    }

    /// Set the open timeout.
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Set the operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Set the close timeout.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Force a callback dispatch discipline.
    pub fn with_callback_concurrency(mut self, concurrency: CallbackConcurrency) -> Self {
        self.callback_concurrency = Some(concurrency);
        self
    }

    /// Dispatch discipline in effect, given the service default.
    pub fn callback_concurrency_or(&self, default: CallbackConcurrency) -> CallbackConcurrency {
        self.callback_concurrency.unwrap_or(default)
    }

    /// Reject values the proxies cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeouts = [
            ("open_timeout_ms", self.open_timeout),
            ("operation_timeout_ms", self.operation_timeout),
            ("close_timeout_ms", self.close_timeout),
        ];
        for (field, value) in timeouts {
            if value.is_zero() {
                return Err(ConfigError::ZeroTimeout { field });
            }
        }
        if self.callback_buffer == 0 {
            return Err(ConfigError::ZeroCallbackBuffer);
        }
        Ok(())
    }
}

/// Configuration for every proxy owned by a [`GameClient`](crate::GameClient).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Session service.
    pub session: ProxyConfig,
    /// Social/friends service.
    pub friends: ProxyConfig,
    /// Lobby service.
    pub lobby: ProxyConfig,
    /// Matchmaking service.
    pub matchmaking: ProxyConfig,
    /// In-match gameplay service.
    pub gameplay: ProxyConfig,
    /// Scoreboard service.
    pub scoreboard: ProxyConfig,
    /// Shared by the request/response services.
    pub one_way: ProxyConfig,
}

impl ClientConfig {
    /// Use the same proxy configuration for every service.
    pub fn uniform(config: ProxyConfig) -> Self {
        Self {
            session: config.clone(),
            friends: config.clone(),
            lobby: config.clone(),
            matchmaking: config.clone(),
            gameplay: config.clone(),
            scoreboard: config.clone(),
            one_way: config,
        }
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every proxy section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for section in [
            &self.session,
            &self.friends,
            &self.lobby,
            &self.matchmaking,
            &self.gameplay,
            &self.scoreboard,
            &self.one_way,
        ] {
            section.validate()?;
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ProxyConfig::default().validate().is_ok());
        assert!(ProxyConfig::local_network().validate().is_ok());
        assert!(ProxyConfig::wan_network().validate().is_ok());
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = ProxyConfig::default()
            .with_operation_timeout(Duration::from_millis(750))
            .with_callback_concurrency(CallbackConcurrency::Concurrent);
        assert_eq!(config.operation_timeout, Duration::from_millis(750));
        assert_eq!(
            config.callback_concurrency_or(CallbackConcurrency::Reentrant),
            CallbackConcurrency::Concurrent
        );
        assert_eq!(
            ProxyConfig::default().callback_concurrency_or(CallbackConcurrency::Reentrant),
            CallbackConcurrency::Reentrant
        );
    }

    #[test]
    fn test_from_json_partial_document() {
        let config = ClientConfig::from_json(
            r#"{
                "lobby": { "operation_timeout_ms": 1500, "callback_concurrency": "concurrent" },
                "one_way": { "close_timeout_ms": 100 }
            }"#,
        )
        .expect("valid config");

        assert_eq!(config.lobby.operation_timeout, Duration::from_millis(1500));
        assert_eq!(
            config.lobby.callback_concurrency,
            Some(CallbackConcurrency::Concurrent)
        );
        assert_eq!(config.lobby.open_timeout, ProxyConfig::default().open_timeout);
        assert_eq!(config.one_way.close_timeout, Duration::from_millis(100));
        assert_eq!(config.session, ProxyConfig::default());
    }

    #[test]
    fn test_from_json_rejects_zero_timeout() {
        let err = ClientConfig::from_json(r#"{ "session": { "open_timeout_ms": 0 } }"#)
            .expect_err("zero timeout");
        assert!(matches!(
            err,
            ConfigError::ZeroTimeout {
                field: "open_timeout_ms"
            }
        ));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            ClientConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_json_roundtrip_keeps_milliseconds() {
        let config = ClientConfig::uniform(ProxyConfig::local_network());
        let json = serde_json::to_string(&config).expect("serialize");
        assert!(json.contains("\"operation_timeout_ms\":2000"));
        let decoded = ClientConfig::from_json(&json).expect("deserialize");
        assert_eq!(decoded, config);
    }
}
