//! Uniform channel shutdown.
//!
//! [`safe_close`] tries a graceful close bounded by a timeout and falls back
//! to an abort. It never fails: whatever happens, the channel is released.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportResult;

/// Anything holding transport resources that must be released.
#[async_trait]
pub trait Closable: Send + Sync {
    /// Close gracefully, flushing pending work.
    async fn close(&self) -> TransportResult<()>;

    /// Release resources immediately. Must not block or fail.
    fn abort(&self);
}

/// How a channel was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The graceful close completed.
    Graceful,
    /// The graceful close failed or timed out and the channel was aborted.
    Aborted,
}

/// Close `channel`, aborting it if the graceful close fails or exceeds `timeout`.
pub async fn safe_close<C>(channel: &C, service: &'static str, timeout: Duration) -> CloseOutcome
where
    C: Closable + ?Sized,
{
    match tokio::time::timeout(timeout, channel.close()).await {
        Ok(Ok(())) => {
            tracing::debug!(service, "channel closed");
            CloseOutcome::Graceful
        }
        Ok(Err(err)) => {
            tracing::debug!(service, error = %err, "close failed, aborting channel");
            channel.abort();
            CloseOutcome::Aborted
        }
        Err(_) => {
            tracing::debug!(service, ?timeout, "close timed out, aborting channel");
            channel.abort();
            CloseOutcome::Aborted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Probe {
        fail: bool,
        hang: bool,
        closes: AtomicUsize,
        aborts: AtomicUsize,
    }

    #[async_trait]
    impl Closable for Probe {
        async fn close(&self) -> TransportResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail {
                return Err(TransportError::Communication("socket reset".into()));
            }
            Ok(())
        }

        fn abort(&self) {
            self.aborts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_graceful_close_does_not_abort() {
        let probe = Probe::default();
        let outcome = safe_close(&probe, "test", Duration::from_secs(1)).await;
        assert_eq!(outcome, CloseOutcome::Graceful);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
        assert_eq!(probe.aborts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_close_falls_back_to_abort() {
        let probe = Probe {
            fail: true,
            ..Probe::default()
        };
        let outcome = safe_close(&probe, "test", Duration::from_secs(1)).await;
        assert_eq!(outcome, CloseOutcome::Aborted);
        assert_eq!(probe.aborts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_close_is_aborted_after_timeout() {
        let probe = Probe {
            hang: true,
            ..Probe::default()
        };
        let outcome = safe_close(&probe, "test", Duration::from_millis(100)).await;
        assert_eq!(outcome, CloseOutcome::Aborted);
        assert_eq!(probe.aborts.load(Ordering::SeqCst), 1);
    }
}
