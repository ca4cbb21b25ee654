//! Server-pushed notifications.
//!
//! A transport delivers inbound push messages through a [`CallbackSink`]
//! attached when the channel is created. The owning duplex proxy drains the
//! sink on a dispatcher task and republishes each message on its
//! [`CallbackBus`], where any number of independent consumers subscribe.
//!
//! ```text
//! transport thread ──notify()──► CallbackSink ──mpsc──► dispatcher ──publish()──► CallbackBus
//!                  ──fault()───►                            │                    ├─► listener
//!                                                           ▼                    ├─► listener
//!                                                   proxy fault path             └─► stream()
//! ```

pub mod bus;
pub mod sink;

pub use bus::{CallbackBus, Listener, SubscriptionId};
pub use sink::CallbackSink;

pub(crate) use sink::{Inbound, callback_channel};

/// A push notification of a duplex service.
pub trait ServiceNotification: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Stable name of the notification kind, used for named subscriptions.
    fn event_name(&self) -> &'static str;
}
