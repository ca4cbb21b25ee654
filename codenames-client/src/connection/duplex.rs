//! Stateful connection to a duplex game service.
//!
//! [`DuplexConnection`] owns at most one live channel and the session
//! identity bound to it. Every service proxy wraps one.
//!
//! # Lifecycle
//!
//! - [`initialize`](DuplexConnection::initialize) creates a channel with a
//!   fresh [`CallbackSink`], opens it and invokes the remote `Connect`
//! - stateful operations lease the open channel; if it is not open they make
//!   exactly one reconnect attempt with the last bound identity
//! - any transport failure during an operation is classified and the channel
//!   is torn down through [`safe_close`]
//! - a fault pushed by the transport moves the connection to `Faulted`
//!
//! # Concurrency
//!
//! The channel slot sits behind an async mutex held for every
//! check-then-open and check-then-close sequence. Remote operations run
//! outside the lock on a leased channel. Each opened channel gets a new
//! epoch; teardown paths only act when the epoch they leased is still the
//! current one, so a late failure on an old channel never closes a newer one.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::callbacks::{CallbackBus, CallbackSink, Inbound, ServiceNotification, callback_channel};
use crate::config::{CallbackConcurrency, ProxyConfig};
use crate::connection::classify_failure;
use crate::connection::close::{Closable, safe_close};
use crate::connection::state::ConnectionState;
use crate::error::{TransportError, TransportResult, with_timeout};
use crate::status::{OperationResult, ServiceReply, StatusCode};
use crate::types::PlayerId;

/// Static description of a duplex service contract.
pub trait DuplexService: Send + Sync + 'static {
    /// Service name used in logs.
    const NAME: &'static str;

    /// Callback dispatch discipline the service requires by default.
    const CALLBACK_CONCURRENCY: CallbackConcurrency;

    /// Status reported for failures the taxonomy does not recognize.
    const UNEXPECTED_FAILURE: StatusCode = StatusCode::ClientError;

    /// Outbound operations.
    type Request: Debug + Send + Sync + 'static;

    /// Replies to outbound operations.
    type Response: Debug + Send + 'static;

    /// Inbound push notifications.
    type Notification: ServiceNotification;
}

/// Client-side handle of a bidirectional channel.
#[async_trait]
pub trait DuplexChannel<S: DuplexService>: Closable {
    /// Open the underlying transport.
    async fn open(&self) -> TransportResult<()>;

    /// Bind `identity` to the channel on the server.
    async fn connect(&self, identity: &PlayerId) -> TransportResult<ServiceReply>;

    /// Release the session on the server.
    async fn disconnect(&self, identity: &PlayerId) -> TransportResult<()>;

    /// Invoke a request/response operation.
    async fn call(&self, request: S::Request) -> TransportResult<S::Response>;

    /// Invoke a one-way operation.
    async fn send(&self, request: S::Request) -> TransportResult<()>;
}

/// Creates channels with the callback handler attached.
pub trait DuplexChannelFactory<S: DuplexService>: Send + Sync {
    /// Create an unopened channel delivering push notifications to `callbacks`.
    fn create(
        &self,
        callbacks: CallbackSink<S::Notification>,
    ) -> TransportResult<Arc<dyn DuplexChannel<S>>>;
}

/// An open channel borrowed for one operation.
struct ChannelLease<S: DuplexService> {
    channel: Arc<dyn DuplexChannel<S>>,
    epoch: u64,
    identity: PlayerId,
}

/// How a leased channel ends when released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    Failed,
    Faulted,
}

struct ChannelSlot<S: DuplexService> {
    channel: Option<Arc<dyn DuplexChannel<S>>>,
    state: ConnectionState,
    epoch: u64,
    identity: Option<PlayerId>,
    last_identity: Option<PlayerId>,
}

impl<S: DuplexService> ChannelSlot<S> {
    fn transition(&mut self, next: ConnectionState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                service = S::NAME,
                from = %self.state,
                to = %next,
                "unexpected connection state transition"
            );
        }
        self.state = next;
    }

    fn lease(&self) -> Option<ChannelLease<S>> {
        if !self.state.is_usable() {
            return None;
        }
        let channel = self.channel.as_ref()?;
        let identity = self.identity.as_ref()?;
        Some(ChannelLease {
            channel: Arc::clone(channel),
            epoch: self.epoch,
            identity: identity.clone(),
        })
    }

    /// Take the channel out of the slot and unbind the session.
    fn detach(&mut self, next: ConnectionState) -> Option<Arc<dyn DuplexChannel<S>>> {
        self.identity = None;
        self.transition(next);
        self.channel.take()
    }
}

struct Shared<S: DuplexService> {
    factory: Arc<dyn DuplexChannelFactory<S>>,
    config: ProxyConfig,
    concurrency: CallbackConcurrency,
    callbacks: CallbackBus<S::Notification>,
    slot: Mutex<ChannelSlot<S>>,
    /// Epoch of the channel currently delivering callbacks, 0 when none.
    live_epoch: AtomicU64,
    next_epoch: AtomicU64,
}

impl<S: DuplexService> Shared<S> {
    /// Tear down the channel of `epoch` if it is still the open one.
    async fn release(&self, epoch: u64, how: Release) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.epoch != epoch || !slot.state.is_usable() {
            return false;
        }
        self.live_epoch.store(0, Ordering::SeqCst);

        let next = match how {
            Release::Failed => ConnectionState::Closing,
            Release::Faulted => ConnectionState::Faulted,
        };
        if let Some(channel) = slot.detach(next) {
            safe_close(channel.as_ref(), S::NAME, self.config.close_timeout).await;
        }
        if how == Release::Failed {
            slot.transition(ConnectionState::Closed);
        }
        true
    }
}

impl<S: DuplexService> Drop for Shared<S> {
    fn drop(&mut self) {
        if let Some(channel) = self.slot.get_mut().channel.take() {
            channel.abort();
        }
    }
}

/// Connection manager for one duplex service.
///
/// Cheap to clone; clones share the channel, the session identity and the
/// callback bus.
pub struct DuplexConnection<S: DuplexService> {
    shared: Arc<Shared<S>>,
}

impl<S: DuplexService> Clone for DuplexConnection<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: DuplexService> DuplexConnection<S> {
    /// Create a connection that opens channels through `factory`.
    ///
    /// No channel is opened until [`initialize`](Self::initialize).
    pub fn new(factory: Arc<dyn DuplexChannelFactory<S>>, config: ProxyConfig) -> Self {
        let concurrency = config.callback_concurrency_or(S::CALLBACK_CONCURRENCY);
        let callbacks = CallbackBus::new(S::NAME, config.callback_buffer);
        Self {
            shared: Arc::new(Shared {
                factory,
                config,
                concurrency,
                callbacks,
                slot: Mutex::new(ChannelSlot {
                    channel: None,
                    state: ConnectionState::Created,
                    epoch: 0,
                    identity: None,
                    last_identity: None,
                }),
                live_epoch: AtomicU64::new(0),
                next_epoch: AtomicU64::new(1),
            }),
        }
    }

    /// Bus on which the service's push notifications are published.
    pub fn callbacks(&self) -> &CallbackBus<S::Notification> {
        &self.shared.callbacks
    }

    /// Callback dispatch discipline in effect.
    pub fn callback_concurrency(&self) -> CallbackConcurrency {
        self.shared.concurrency
    }

    /// Current channel state.
    pub async fn state(&self) -> ConnectionState {
        self.shared.slot.lock().await.state
    }

    /// Identity bound to the open channel.
    pub async fn identity(&self) -> Option<PlayerId> {
        self.shared.slot.lock().await.identity.clone()
    }

    /// Open a channel and bind `identity` to it.
    ///
    /// # Returns
    ///
    /// - `MissingData` if `identity` is empty; nothing is attempted
    /// - `Unauthorized` if a channel is already open; `Connect` is not invoked
    /// - the classified failure if the channel cannot be opened or connected
    /// - the server's code if it rejects `Connect`
    pub async fn initialize(&self, identity: &PlayerId) -> OperationResult {
        if identity.is_empty() {
            tracing::debug!(service = S::NAME, "initialize without identity");
            return OperationResult::failure(StatusCode::MissingData);
        }

        let mut slot = self.shared.slot.lock().await;
        if slot.state.is_usable() {
            tracing::debug!(service = S::NAME, %identity, "already connected");
            return OperationResult::failure(StatusCode::Unauthorized);
        }

        match self.open_locked(&mut slot, identity).await {
            Ok(()) => OperationResult::ok(),
            Err(code) => OperationResult::failure(code),
        }
    }

    /// Release the session and close the channel.
    ///
    /// Always forgets the identity, so later operations will not reconnect,
    /// even after the channel was already lost. Makes no remote call and
    /// leaves the state unchanged unless the channel is open.
    pub async fn disconnect(&self) {
        let mut slot = self.shared.slot.lock().await;
        slot.last_identity = None;
        if !slot.state.is_usable() {
            slot.identity = None;
            tracing::debug!(service = S::NAME, state = %slot.state, "disconnect ignored");
            return;
        }
        self.shared.live_epoch.store(0, Ordering::SeqCst);

        let identity = slot.identity.clone();
        if let Some(channel) = slot.detach(ConnectionState::Closing) {
            if let Some(identity) = identity.as_ref() {
                let timeout = self.shared.config.operation_timeout;
                if let Err(err) = with_timeout(timeout, channel.disconnect(identity)).await {
                    tracing::debug!(
                        service = S::NAME,
                        %identity,
                        error = %err,
                        "remote disconnect failed"
                    );
                }
            }
            safe_close(channel.as_ref(), S::NAME, self.shared.config.close_timeout).await;
        }
        slot.transition(ConnectionState::Closed);
        tracing::info!(service = S::NAME, identity = ?identity, "disconnected");
    }

    /// Invoke a request/response operation on the open channel.
    ///
    /// `request` builds the message from the bound identity; `decode` picks
    /// the expected reply out of the service's response type. A decode error
    /// is treated like any other unexpected failure.
    pub async fn call<T, B, D>(
        &self,
        operation: &'static str,
        request: B,
        decode: D,
    ) -> Result<T, StatusCode>
    where
        B: FnOnce(&PlayerId) -> S::Request + Send,
        D: FnOnce(S::Response) -> TransportResult<T> + Send,
        T: Send,
    {
        let lease = self.lease(operation, None).await?;
        self.invoke(operation, lease, request, decode).await
    }

    /// Like [`call`](Self::call), but reconnects as `identity` when no
    /// channel is open.
    ///
    /// Used by operations that name the player explicitly and may be the
    /// first call after a lost session.
    pub async fn call_as<T, B, D>(
        &self,
        operation: &'static str,
        identity: &PlayerId,
        request: B,
        decode: D,
    ) -> Result<T, StatusCode>
    where
        B: FnOnce(&PlayerId) -> S::Request + Send,
        D: FnOnce(S::Response) -> TransportResult<T> + Send,
        T: Send,
    {
        if identity.is_empty() {
            return Err(StatusCode::MissingData);
        }
        let lease = self.lease(operation, Some(identity)).await?;
        self.invoke(operation, lease, request, decode).await
    }

    /// Invoke a one-way operation on the open channel.
    pub async fn send<B>(&self, operation: &'static str, request: B) -> Result<(), StatusCode>
    where
        B: FnOnce(&PlayerId) -> S::Request + Send,
    {
        let lease = self.lease(operation, None).await?;
        let message = request(&lease.identity);
        let timeout = self.shared.config.operation_timeout;

        match with_timeout(timeout, lease.channel.send(message)).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fail(operation, lease, &err).await),
        }
    }

    async fn invoke<T, B, D>(
        &self,
        operation: &'static str,
        lease: ChannelLease<S>,
        request: B,
        decode: D,
    ) -> Result<T, StatusCode>
    where
        B: FnOnce(&PlayerId) -> S::Request + Send,
        D: FnOnce(S::Response) -> TransportResult<T> + Send,
        T: Send,
    {
        let message = request(&lease.identity);
        let timeout = self.shared.config.operation_timeout;
        let outcome = with_timeout(timeout, lease.channel.call(message))
            .await
            .and_then(decode);

        match outcome {
            Ok(value) => Ok(value),
            Err(err) => Err(self.fail(operation, lease, &err).await),
        }
    }

    /// Borrow the open channel, reconnecting once if needed.
    ///
    /// The reconnect uses `identity` when given, the last bound identity
    /// otherwise.
    async fn lease(
        &self,
        operation: &'static str,
        identity: Option<&PlayerId>,
    ) -> Result<ChannelLease<S>, StatusCode> {
        let mut slot = self.shared.slot.lock().await;
        if let Some(lease) = slot.lease() {
            return Ok(lease);
        }

        let Some(identity) = identity.cloned().or_else(|| slot.last_identity.clone()) else {
            tracing::debug!(
                service = S::NAME,
                operation,
                state = %slot.state,
                "no session to reconnect"
            );
            return Err(StatusCode::ServerUnavailable);
        };

        tracing::debug!(service = S::NAME, operation, %identity, "reconnecting before operation");
        match self.open_locked(&mut slot, &identity).await {
            Ok(()) => slot.lease().ok_or(StatusCode::ServerUnavailable),
            Err(code) => {
                tracing::debug!(service = S::NAME, operation, status = %code, "reconnect failed");
                Err(StatusCode::ServerUnavailable)
            }
        }
    }

    async fn fail(
        &self,
        operation: &'static str,
        lease: ChannelLease<S>,
        err: &TransportError,
    ) -> StatusCode {
        let code = classify_failure(S::NAME, operation, err, S::UNEXPECTED_FAILURE);
        let ChannelLease { channel, epoch, .. } = lease;
        drop(channel);
        self.shared.release(epoch, Release::Failed).await;
        code
    }

    /// Create, open and connect a channel. The caller holds the slot lock.
    async fn open_locked(
        &self,
        slot: &mut ChannelSlot<S>,
        identity: &PlayerId,
    ) -> Result<(), StatusCode> {
        let config = &self.shared.config;
        let epoch = self.shared.next_epoch.fetch_add(1, Ordering::SeqCst);
        let (sink, inbound) = callback_channel(S::NAME);

        let channel = match self.shared.factory.create(sink) {
            Ok(channel) => channel,
            Err(err) => {
                slot.transition(ConnectionState::Closed);
                return Err(classify_failure(S::NAME, "Open", &err, S::UNEXPECTED_FAILURE));
            }
        };

        let connected = async {
            with_timeout(config.open_timeout, channel.open()).await?;
            with_timeout(config.operation_timeout, channel.connect(identity)).await
        }
        .await;

        let rejected = match connected {
            Ok(reply) if reply.is_success => None,
            Ok(reply) => {
                let code = OperationResult::from_reply(reply).status_code();
                tracing::debug!(service = S::NAME, %identity, status = %code, "connect rejected");
                Some(code)
            }
            Err(err) => Some(classify_failure(S::NAME, "Connect", &err, S::UNEXPECTED_FAILURE)),
        };
        if let Some(code) = rejected {
            safe_close(channel.as_ref(), S::NAME, config.close_timeout).await;
            slot.transition(ConnectionState::Closed);
            return Err(code);
        }

        slot.channel = Some(channel);
        slot.epoch = epoch;
        slot.identity = Some(identity.clone());
        slot.last_identity = Some(identity.clone());
        slot.transition(ConnectionState::Opened);
        self.shared.live_epoch.store(epoch, Ordering::SeqCst);

        tokio::spawn(dispatch(
            Arc::downgrade(&self.shared),
            epoch,
            self.shared.concurrency,
            inbound,
        ));

        tracing::info!(service = S::NAME, %identity, epoch, "channel opened");
        Ok(())
    }
}

impl<S: DuplexService> std::fmt::Debug for DuplexConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexConnection")
            .field("service", &S::NAME)
            .field("concurrency", &self.shared.concurrency)
            .field("live_epoch", &self.shared.live_epoch.load(Ordering::Relaxed))
            .finish()
    }
}

/// Drain one channel's inbound messages onto the callback bus.
///
/// Holds only a weak reference so an abandoned connection can be dropped.
/// Exits on the first message that arrives after its channel was released.
async fn dispatch<S: DuplexService>(
    shared: Weak<Shared<S>>,
    epoch: u64,
    concurrency: CallbackConcurrency,
    mut inbound: mpsc::UnboundedReceiver<Inbound<S::Notification>>,
) {
    while let Some(message) = inbound.recv().await {
        let Some(owner) = shared.upgrade() else {
            break;
        };
        if owner.live_epoch.load(Ordering::SeqCst) != epoch {
            tracing::trace!(service = S::NAME, epoch, "dropping callback from released channel");
            break;
        }

        match message {
            Inbound::Notification(notification) => match concurrency {
                CallbackConcurrency::Reentrant => {
                    owner.callbacks.publish(notification);
                }
                CallbackConcurrency::Concurrent => {
                    let callbacks = owner.callbacks.clone();
                    tokio::spawn(async move {
                        callbacks.publish(notification);
                    });
                }
            },
            Inbound::Fault(reason) => {
                tracing::warn!(service = S::NAME, epoch, %reason, "channel faulted");
                owner.release(epoch, Release::Faulted).await;
                break;
            }
        }
    }
}
