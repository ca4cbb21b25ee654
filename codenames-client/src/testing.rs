//! Scripted in-memory transports.
//!
//! [`MockDuplexFactory`] and [`MockOneWayFactory`] stand in for real
//! bindings. Failures are queued and consumed in order; everything the proxy
//! does is counted so tests can assert how many remote calls were made.
//!
//! ```rust,ignore
//! let factory = MockDuplexFactory::<Lobby>::new();
//! factory.respond_with(|request| match request {
//!     LobbyRequest::CreateParty { host } => LobbyResponse::Party(party_for(host)),
//!     _ => LobbyResponse::Reply(ServiceReply::ok()),
//! });
//! factory.fail_next_call(TransportError::Timeout(Duration::from_secs(1)));
//! let lobby = LobbyProxy::new(factory.clone().into_dyn(), ProxyConfig::default());
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::callbacks::CallbackSink;
use crate::connection::{Closable, DuplexChannel, DuplexChannelFactory, DuplexService};
use crate::connection::{OneWayClient, OneWayClientFactory, OneWayService};
use crate::error::{TransportError, TransportResult};
use crate::status::ServiceReply;
use crate::types::PlayerId;

type Responder<Req, Resp> = Arc<dyn Fn(&Req) -> Resp + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counts every interaction with a mock transport.
#[derive(Debug, Default)]
pub struct CallCounters {
    creates: AtomicUsize,
    opens: AtomicUsize,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    calls: AtomicUsize,
    sends: AtomicUsize,
    closes: AtomicUsize,
    aborts: AtomicUsize,
}

impl CallCounters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Channels or clients created.
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Channel opens attempted.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Remote `Connect` invocations.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Remote `Disconnect` invocations.
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Request/response operations invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// One-way operations invoked.
    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    /// Graceful closes attempted.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Aborts.
    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }
}

struct DuplexScript<S: DuplexService> {
    create_failures: VecDeque<TransportError>,
    open_failures: VecDeque<TransportError>,
    connect_replies: VecDeque<TransportResult<ServiceReply>>,
    call_failures: VecDeque<TransportError>,
    responder: Option<Responder<S::Request, S::Response>>,
    close_failure: Option<TransportError>,
    stall_calls: bool,
    stall_close: bool,
}

struct DuplexMockState<S: DuplexService> {
    script: Mutex<DuplexScript<S>>,
    counters: CallCounters,
    requests: Mutex<Vec<S::Request>>,
    connected_as: Mutex<Vec<PlayerId>>,
    sink: Mutex<Option<CallbackSink<S::Notification>>>,
}

/// Scripted duplex transport.
///
/// Unscripted operations succeed: `Connect` replies OK, `send` is accepted
/// and `call` answers through the responder. A `call` without a responder
/// fails with an unexpected error.
pub struct MockDuplexFactory<S: DuplexService> {
    state: Arc<DuplexMockState<S>>,
}

impl<S: DuplexService> Clone for MockDuplexFactory<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: DuplexService> Default for MockDuplexFactory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DuplexService> MockDuplexFactory<S> {
    /// Transport where everything succeeds.
    pub fn new() -> Self {
        Self {
            state: Arc::new(DuplexMockState {
                script: Mutex::new(DuplexScript {
                    create_failures: VecDeque::new(),
                    open_failures: VecDeque::new(),
                    connect_replies: VecDeque::new(),
                    call_failures: VecDeque::new(),
                    responder: None,
                    close_failure: None,
                    stall_calls: false,
                    stall_close: false,
                }),
                counters: CallCounters::default(),
                requests: Mutex::new(Vec::new()),
                connected_as: Mutex::new(Vec::new()),
                sink: Mutex::new(None),
            }),
        }
    }

    /// The factory as the trait object proxies take.
    pub fn into_dyn(self) -> Arc<dyn DuplexChannelFactory<S>> {
        Arc::new(self)
    }

    /// Fail the next channel creation.
    pub fn fail_next_create(&self, error: TransportError) {
        lock(&self.state.script).create_failures.push_back(error);
    }

    /// Fail the next channel open.
    pub fn fail_next_open(&self, error: TransportError) {
        lock(&self.state.script).open_failures.push_back(error);
    }

    /// Outcome of the next `Connect`.
    pub fn next_connect(&self, outcome: TransportResult<ServiceReply>) {
        lock(&self.state.script).connect_replies.push_back(outcome);
    }

    /// Fail the next `call` or `send`.
    pub fn fail_next_call(&self, error: TransportError) {
        lock(&self.state.script).call_failures.push_back(error);
    }

    /// Answer calls with `responder`.
    pub fn respond_with(
        &self,
        responder: impl Fn(&S::Request) -> S::Response + Send + Sync + 'static,
    ) {
        lock(&self.state.script).responder = Some(Arc::new(responder));
    }

    /// Make every graceful close fail with `error`.
    pub fn fail_closes(&self, error: TransportError) {
        lock(&self.state.script).close_failure = Some(error);
    }

    /// Make calls and sends never complete.
    pub fn stall_calls(&self, stall: bool) {
        lock(&self.state.script).stall_calls = stall;
    }

    /// Make graceful closes never complete.
    pub fn stall_closes(&self, stall: bool) {
        lock(&self.state.script).stall_close = stall;
    }

    /// Interaction counters.
    pub fn counters(&self) -> &CallCounters {
        &self.state.counters
    }

    /// Identities passed to `Connect`, in order.
    pub fn connected_as(&self) -> Vec<PlayerId> {
        lock(&self.state.connected_as).clone()
    }

    /// Requests received by `call` and `send`, in order.
    pub fn requests(&self) -> Vec<S::Request>
    where
        S::Request: Clone,
    {
        lock(&self.state.requests).clone()
    }

    /// Push a notification on the most recently created channel.
    pub fn push(&self, notification: S::Notification) -> bool {
        match lock(&self.state.sink).as_ref() {
            Some(sink) => sink.notify(notification),
            None => false,
        }
    }

    /// Fault the most recently created channel.
    pub fn fault(&self, reason: &str) -> bool {
        match lock(&self.state.sink).as_ref() {
            Some(sink) => sink.fault(reason),
            None => false,
        }
    }

    /// Sink of the most recently created channel.
    pub fn sink(&self) -> Option<CallbackSink<S::Notification>> {
        lock(&self.state.sink).clone()
    }
}

impl<S: DuplexService> DuplexChannelFactory<S> for MockDuplexFactory<S> {
    fn create(
        &self,
        callbacks: CallbackSink<S::Notification>,
    ) -> TransportResult<Arc<dyn DuplexChannel<S>>> {
        CallCounters::bump(&self.state.counters.creates);
        if let Some(error) = lock(&self.state.script).create_failures.pop_front() {
            return Err(error);
        }
        *lock(&self.state.sink) = Some(callbacks);
        Ok(Arc::new(MockChannel {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockChannel<S: DuplexService> {
    state: Arc<DuplexMockState<S>>,
}

impl<S: DuplexService> MockChannel<S> {
    /// Scripted failure of the next exchange, or the responder to answer with.
    async fn exchange(&self) -> TransportResult<Option<Responder<S::Request, S::Response>>> {
        let (failure, stall, responder) = {
            let mut script = lock(&self.state.script);
            (script.call_failures.pop_front(), script.stall_calls, script.responder.clone())
        };
        if stall {
            std::future::pending::<()>().await;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(responder),
        }
    }
}

#[async_trait]
impl<S: DuplexService> Closable for MockChannel<S> {
    async fn close(&self) -> TransportResult<()> {
        CallCounters::bump(&self.state.counters.closes);
        let (failure, stall) = {
            let script = lock(&self.state.script);
            (script.close_failure.clone(), script.stall_close)
        };
        if stall {
            std::future::pending::<()>().await;
        }
        failure.map_or(Ok(()), Err)
    }

    fn abort(&self) {
        CallCounters::bump(&self.state.counters.aborts);
    }
}

#[async_trait]
impl<S: DuplexService> DuplexChannel<S> for MockChannel<S> {
    async fn open(&self) -> TransportResult<()> {
        CallCounters::bump(&self.state.counters.opens);
        match lock(&self.state.script).open_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn connect(&self, identity: &PlayerId) -> TransportResult<ServiceReply> {
        CallCounters::bump(&self.state.counters.connects);
        lock(&self.state.connected_as).push(identity.clone());
        let scripted = lock(&self.state.script).connect_replies.pop_front();
        scripted.unwrap_or(Ok(ServiceReply::ok()))
    }

    async fn disconnect(&self, _identity: &PlayerId) -> TransportResult<()> {
        CallCounters::bump(&self.state.counters.disconnects);
        Ok(())
    }

    async fn call(&self, request: S::Request) -> TransportResult<S::Response> {
        CallCounters::bump(&self.state.counters.calls);
        let responder = self.exchange().await;
        let response = responder.and_then(|responder| match responder {
            Some(responder) => Ok((*responder)(&request)),
            None => Err(TransportError::Unexpected("no responder scripted".into())),
        });
        lock(&self.state.requests).push(request);
        response
    }

    async fn send(&self, request: S::Request) -> TransportResult<()> {
        CallCounters::bump(&self.state.counters.sends);
        let outcome = self.exchange().await.map(|_| ());
        lock(&self.state.requests).push(request);
        outcome
    }
}

struct OneWayScript<S: OneWayService> {
    create_failures: VecDeque<TransportError>,
    call_failures: VecDeque<TransportError>,
    responder: Option<Responder<S::Request, S::Response>>,
    close_failure: Option<TransportError>,
    stall_calls: bool,
}

struct OneWayMockState<S: OneWayService> {
    script: Mutex<OneWayScript<S>>,
    counters: CallCounters,
    requests: Mutex<Vec<S::Request>>,
}

/// Scripted request/response transport.
pub struct MockOneWayFactory<S: OneWayService> {
    state: Arc<OneWayMockState<S>>,
}

impl<S: OneWayService> Clone for MockOneWayFactory<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: OneWayService> Default for MockOneWayFactory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: OneWayService> MockOneWayFactory<S> {
    /// Transport where every client is created and closed successfully.
    pub fn new() -> Self {
        Self {
            state: Arc::new(OneWayMockState {
                script: Mutex::new(OneWayScript {
                    create_failures: VecDeque::new(),
                    call_failures: VecDeque::new(),
                    responder: None,
                    close_failure: None,
                    stall_calls: false,
                }),
                counters: CallCounters::default(),
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The factory as the trait object proxies take.
    pub fn into_dyn(self) -> Arc<dyn OneWayClientFactory<S>> {
        Arc::new(self)
    }

    /// Fail the next client creation.
    pub fn fail_next_create(&self, error: TransportError) {
        lock(&self.state.script).create_failures.push_back(error);
    }

    /// Fail the next call.
    pub fn fail_next_call(&self, error: TransportError) {
        lock(&self.state.script).call_failures.push_back(error);
    }

    /// Answer calls with `responder`.
    pub fn respond_with(
        &self,
        responder: impl Fn(&S::Request) -> S::Response + Send + Sync + 'static,
    ) {
        lock(&self.state.script).responder = Some(Arc::new(responder));
    }

    /// Make every graceful close fail with `error`.
    pub fn fail_closes(&self, error: TransportError) {
        lock(&self.state.script).close_failure = Some(error);
    }

    /// Make calls never complete.
    pub fn stall_calls(&self, stall: bool) {
        lock(&self.state.script).stall_calls = stall;
    }

    /// Interaction counters.
    pub fn counters(&self) -> &CallCounters {
        &self.state.counters
    }

    /// Requests received, in order.
    pub fn requests(&self) -> Vec<S::Request>
    where
        S::Request: Clone,
    {
        lock(&self.state.requests).clone()
    }
}

impl<S: OneWayService> OneWayClientFactory<S> for MockOneWayFactory<S> {
    fn create(&self) -> TransportResult<Box<dyn OneWayClient<S>>> {
        CallCounters::bump(&self.state.counters.creates);
        if let Some(error) = lock(&self.state.script).create_failures.pop_front() {
            return Err(error);
        }
        Ok(Box::new(MockClient {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockClient<S: OneWayService> {
    state: Arc<OneWayMockState<S>>,
}

#[async_trait]
impl<S: OneWayService> Closable for MockClient<S> {
    async fn close(&self) -> TransportResult<()> {
        CallCounters::bump(&self.state.counters.closes);
        let failure = lock(&self.state.script).close_failure.clone();
        failure.map_or(Ok(()), Err)
    }

    fn abort(&self) {
        CallCounters::bump(&self.state.counters.aborts);
    }
}

#[async_trait]
impl<S: OneWayService> OneWayClient<S> for MockClient<S> {
    async fn call(&self, request: S::Request) -> TransportResult<S::Response> {
        CallCounters::bump(&self.state.counters.calls);
        let (failure, stall, responder) = {
            let mut script = lock(&self.state.script);
            (script.call_failures.pop_front(), script.stall_calls, script.responder.clone())
        };
        if stall {
            std::future::pending::<()>().await;
        }
        let response = match (failure, responder) {
            (Some(error), _) => Err(error),
            (None, Some(responder)) => Ok((*responder)(&request)),
            (None, None) => Err(TransportError::Unexpected("no responder scripted".into())),
        };
        lock(&self.state.requests).push(request);
        response
    }
}
