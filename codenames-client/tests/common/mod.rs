//! Shared helpers for the integration suites.

#![allow(dead_code)]

use std::time::Duration;

use codenames_client::{ConnectionState, DuplexConnection, DuplexService, PlayerId, ProxyConfig};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once per binary. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Short deadlines so timeout paths finish quickly.
pub fn test_config() -> ProxyConfig {
    ProxyConfig::default()
        .with_open_timeout(Duration::from_millis(200))
        .with_operation_timeout(Duration::from_millis(500))
        .with_close_timeout(Duration::from_millis(100))
}

pub fn player(id: &str) -> PlayerId {
    PlayerId::from(id)
}

/// Poll until the connection reaches `expected`.
pub async fn wait_for_state<S: DuplexService>(
    connection: &DuplexConnection<S>,
    expected: ConnectionState,
) -> bool {
    for _ in 0..200 {
        if connection.state().await == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

/// Next notification on `stream`, or `None` after two seconds.
pub async fn next_event<N: Clone>(stream: &mut broadcast::Receiver<N>) -> Option<N> {
    tokio::time::timeout(Duration::from_secs(2), stream.recv())
        .await
        .ok()?
        .ok()
}

/// Assert nothing else arrives on `stream` for a short while.
pub async fn assert_quiet<N: Clone + std::fmt::Debug>(stream: &mut broadcast::Receiver<N>) {
    let extra = tokio::time::timeout(Duration::from_millis(50), stream.recv()).await;
    assert!(extra.is_err(), "unexpected notification: {extra:?}");
}
