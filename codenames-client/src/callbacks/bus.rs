//! Multi-subscriber notification bus.
//!
//! Each duplex proxy owns one [`CallbackBus`]. Application code subscribes
//! either with a synchronous listener ([`CallbackBus::subscribe`]) or with an
//! async stream ([`CallbackBus::stream`]); the proxy only publishes.
//!
//! The subscriber set belongs to the bus, not to a channel: it survives any
//! number of open/close cycles of the proxy that owns it.
//!
//! # Example
//!
//! ```rust,ignore
//! let id = lobby.callbacks().subscribe_named("invitation_received", |event| {
//!     tracing::info!(?event, "invited");
//! });
//! // ...
//! lobby.callbacks().unsubscribe(id);
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;

use super::ServiceNotification;

/// Synchronous callback listener.
pub type Listener<N> = Arc<dyn Fn(&N) + Send + Sync>;

/// Handle returned by [`CallbackBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

struct Subscriber<N> {
    id: SubscriptionId,
    event_name: Option<&'static str>,
    listener: Listener<N>,
}

struct BusInner<N> {
    service: &'static str,
    next_id: AtomicU64,
    subscribers: RwLock<Vec<Subscriber<N>>>,
    stream: broadcast::Sender<N>,
}

/// Typed publish/subscribe bus for a service's push notifications.
///
/// Cheap to clone; clones share the subscriber set.
pub struct CallbackBus<N> {
    inner: Arc<BusInner<N>>,
}

impl<N> Clone for CallbackBus<N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<N: ServiceNotification> CallbackBus<N> {
    /// Create a bus whose async stream buffers up to `capacity` notifications.
    pub fn new(service: &'static str, capacity: usize) -> Self {
        let (stream, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(BusInner {
                service,
                next_id: AtomicU64::new(1),
                subscribers: RwLock::new(Vec::new()),
                stream,
            }),
        }
    }

    /// Service the bus belongs to.
    pub fn service(&self) -> &'static str {
        self.inner.service
    }

    /// Register a listener for every notification.
    pub fn subscribe(&self, listener: impl Fn(&N) + Send + Sync + 'static) -> SubscriptionId {
        self.insert(None, Arc::new(listener))
    }

    /// Register a listener for notifications whose
    /// [`event_name`](ServiceNotification::event_name) equals `event_name`.
    pub fn subscribe_named(
        &self,
        event_name: &'static str,
        listener: impl Fn(&N) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.insert(Some(event_name), Arc::new(listener))
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.id != id);
        before != subscribers.len()
    }

    /// Async stream of every notification published from now on.
    pub fn stream(&self) -> broadcast::Receiver<N> {
        self.inner.stream.subscribe()
    }

    /// Number of registered listeners (streams excluded).
    pub fn listener_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver `notification` to every matching listener and stream.
    ///
    /// Listeners are snapshotted first, so a listener may subscribe or
    /// unsubscribe while being invoked. A panicking listener does not prevent
    /// delivery to the others. Returns the number of listeners that ran to
    /// completion.
    pub fn publish(&self, notification: N) -> usize {
        let event_name = notification.event_name();
        let listeners: Vec<Listener<N>> = self
            .inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|subscriber| subscriber.event_name.map_or(true, |name| name == event_name))
            .map(|subscriber| Arc::clone(&subscriber.listener))
            .collect();

        let mut delivered = 0;
        for listener in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| (*listener)(&notification))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::error!(
                    service = self.inner.service,
                    event = event_name,
                    "callback listener panicked"
                ),
            }
        }

        // No receivers is not an error
        let _ = self.inner.stream.send(notification);

        tracing::trace!(
            service = self.inner.service,
            event = event_name,
            delivered,
            "published callback"
        );
        delivered
    }

    fn insert(&self, event_name: Option<&'static str>, listener: Listener<N>) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                id,
                event_name,
                listener,
            });
        id
    }
}

impl<N> std::fmt::Debug for CallbackBus<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self
            .inner
            .subscribers
            .read()
            .map(|subscribers| subscribers.len())
            .unwrap_or_default();
        f.debug_struct("CallbackBus")
            .field("service", &self.inner.service)
            .field("listeners", &listeners)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        Online(u32),
        Offline(u32),
    }

    impl ServiceNotification for Ping {
        fn event_name(&self) -> &'static str {
            match self {
                Ping::Online(_) => "online",
                Ping::Offline(_) => "offline",
            }
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<Ping>>>, impl Fn(&Ping) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |ping: &Ping| {
            sink.lock().expect("lock").push(ping.clone())
        })
    }

    #[test]
    fn test_every_subscriber_receives_notification() {
        let bus = CallbackBus::new("test", 8);
        let (first, listener_a) = recorder();
        let (second, listener_b) = recorder();
        bus.subscribe(listener_a);
        bus.subscribe(listener_b);

        assert_eq!(bus.publish(Ping::Online(1)), 2);
        assert_eq!(*first.lock().expect("lock"), vec![Ping::Online(1)]);
        assert_eq!(*second.lock().expect("lock"), vec![Ping::Online(1)]);
    }

    #[test]
    fn test_named_subscription_filters_events() {
        let bus = CallbackBus::new("test", 8);
        let (seen, listener) = recorder();
        bus.subscribe_named("offline", listener);

        bus.publish(Ping::Online(1));
        bus.publish(Ping::Offline(2));
        assert_eq!(*seen.lock().expect("lock"), vec![Ping::Offline(2)]);
    }

    #[test]
    fn test_unsubscribe_leaves_other_subscribers_intact() {
        let bus = CallbackBus::new("test", 8);
        let (kept, listener_a) = recorder();
        let (dropped, listener_b) = recorder();
        bus.subscribe(listener_a);
        let id = bus.subscribe(listener_b);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.listener_count(), 1);

        bus.publish(Ping::Online(3));
        assert_eq!(kept.lock().expect("lock").len(), 1);
        assert!(dropped.lock().expect("lock").is_empty());
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let bus = CallbackBus::new("test", 8);
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicU64::new(0));

        let id = {
            let handle = bus.clone();
            let slot = Arc::clone(&slot);
            let calls = Arc::clone(&calls);
            bus.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = slot.lock().expect("lock").take() {
                    handle.unsubscribe(id);
                }
            })
        };
        *slot.lock().expect("lock") = Some(id);

        bus.publish(Ping::Online(1));
        bus.publish(Ping::Online(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let bus = CallbackBus::new("test", 8);
        bus.subscribe(|_| panic!("listener bug"));
        let (seen, listener) = recorder();
        bus.subscribe(listener);

        assert_eq!(bus.publish(Ping::Online(9)), 1);
        assert_eq!(seen.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn test_stream_receives_published_notifications() {
        let bus = CallbackBus::new("test", 8);
        let mut stream = bus.stream();

        bus.publish(Ping::Offline(4));
        assert_eq!(stream.recv().await.expect("recv"), Ping::Offline(4));
    }

    #[test]
    fn test_concurrent_subscribe_and_unsubscribe() {
        let bus: CallbackBus<Ping> = CallbackBus::new("test", 8);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bus = bus.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let id = bus.subscribe(|_| {});
                        bus.publish(Ping::Online(0));
                        assert!(bus.unsubscribe(id));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread");
        }
        assert_eq!(bus.listener_count(), 0);
    }
}
