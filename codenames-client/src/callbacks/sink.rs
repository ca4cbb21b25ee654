//! Inbound side of a duplex channel.

use tokio::sync::mpsc;

/// Message delivered by the transport to the owning proxy.
#[derive(Debug)]
pub(crate) enum Inbound<N> {
    Notification(N),
    Fault(String),
}

/// Handle through which a transport pushes notifications and faults.
///
/// Handed to [`DuplexChannelFactory::create`](crate::DuplexChannelFactory::create)
/// for every new channel. Sending never blocks, so it is safe to call from
/// transport threads.
pub struct CallbackSink<N> {
    service: &'static str,
    tx: mpsc::UnboundedSender<Inbound<N>>,
}

impl<N> Clone for CallbackSink<N> {
    fn clone(&self) -> Self {
        Self {
            service: self.service,
            tx: self.tx.clone(),
        }
    }
}

impl<N> CallbackSink<N> {
    /// Deliver a push notification. Returns `false` once the channel is gone.
    pub fn notify(&self, notification: N) -> bool {
        let delivered = self.tx.send(Inbound::Notification(notification)).is_ok();
        if !delivered {
            tracing::trace!(service = self.service, "notification after channel release");
        }
        delivered
    }

    /// Signal that the channel faulted out of band.
    pub fn fault(&self, reason: impl Into<String>) -> bool {
        self.tx.send(Inbound::Fault(reason.into())).is_ok()
    }

    /// Whether the proxy stopped listening on this channel.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Service the sink belongs to.
    pub fn service(&self) -> &'static str {
        self.service
    }
}

impl<N> std::fmt::Debug for CallbackSink<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSink")
            .field("service", &self.service)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Create a sink and the receiver the dispatcher drains.
pub(crate) fn callback_channel<N>(
    service: &'static str,
) -> (CallbackSink<N>, mpsc::UnboundedReceiver<Inbound<N>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CallbackSink { service, tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_forwards_in_order() {
        let (sink, mut rx) = callback_channel::<u32>("test");
        assert!(sink.notify(1));
        assert!(sink.fault("server restarted"));

        assert!(matches!(rx.recv().await, Some(Inbound::Notification(1))));
        match rx.recv().await {
            Some(Inbound::Fault(reason)) => assert_eq!(reason, "server restarted"),
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_sink_reports_released_channel() {
        let (sink, rx) = callback_channel::<u32>("test");
        drop(rx);
        assert!(sink.is_closed());
        assert!(!sink.notify(5));
        assert!(!sink.fault("late"));
    }
}
