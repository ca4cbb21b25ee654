//! Stateless request/response connection.
//!
//! Every call creates a fresh client, performs exactly one remote operation
//! and releases the client on every exit path. Nothing survives between
//! calls.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ProxyConfig;
use crate::connection::classify_failure;
use crate::connection::close::{Closable, safe_close};
use crate::error::{TransportResult, with_timeout};
use crate::status::StatusCode;

/// Static description of a one-way service contract.
pub trait OneWayService: Send + Sync + 'static {
    /// Service name used in logs.
    const NAME: &'static str;

    /// Status reported for failures the taxonomy does not recognize.
    const UNEXPECTED_FAILURE: StatusCode = StatusCode::ClientError;

    /// Operations.
    type Request: Debug + Send + Sync + 'static;

    /// Replies.
    type Response: Debug + Send + 'static;
}

/// A request/response client used for a single call.
#[async_trait]
pub trait OneWayClient<S: OneWayService>: Closable {
    /// Invoke an operation.
    async fn call(&self, request: S::Request) -> TransportResult<S::Response>;
}

/// Creates one client per call.
pub trait OneWayClientFactory<S: OneWayService>: Send + Sync {
    /// Create a ready-to-use client.
    fn create(&self) -> TransportResult<Box<dyn OneWayClient<S>>>;
}

/// Aborts the client if the call is dropped before it was closed.
struct ClientGuard<S: OneWayService> {
    client: Box<dyn OneWayClient<S>>,
    released: bool,
}

impl<S: OneWayService> ClientGuard<S> {
    async fn release(mut self, close_timeout: Duration) {
        safe_close(self.client.as_ref(), S::NAME, close_timeout).await;
        self.released = true;
    }
}

impl<S: OneWayService> Drop for ClientGuard<S> {
    fn drop(&mut self) {
        if !self.released {
            tracing::debug!(service = S::NAME, "call abandoned, aborting client");
            self.client.abort();
        }
    }
}

/// Connection manager for one one-way service.
pub struct OneWayConnection<S: OneWayService> {
    factory: Arc<dyn OneWayClientFactory<S>>,
    config: ProxyConfig,
}

impl<S: OneWayService> Clone for OneWayConnection<S> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            config: self.config.clone(),
        }
    }
}

impl<S: OneWayService> OneWayConnection<S> {
    /// Create a connection that builds clients through `factory`.
    pub fn new(factory: Arc<dyn OneWayClientFactory<S>>, config: ProxyConfig) -> Self {
        Self { factory, config }
    }

    /// Invoke `request` on a fresh client.
    ///
    /// `decode` picks the expected reply out of the response. The client is
    /// closed whether the call succeeds or fails, and failures are classified
    /// into a [`StatusCode`].
    pub async fn call<T, D>(
        &self,
        operation: &'static str,
        request: S::Request,
        decode: D,
    ) -> Result<T, StatusCode>
    where
        D: FnOnce(S::Response) -> TransportResult<T> + Send,
        T: Send,
    {
        let guard = match self.factory.create() {
            Ok(client) => ClientGuard {
                client,
                released: false,
            },
            Err(err) => {
                return Err(classify_failure(
                    S::NAME,
                    operation,
                    &err,
                    S::UNEXPECTED_FAILURE,
                ));
            }
        };

        let outcome = with_timeout(self.config.operation_timeout, guard.client.call(request))
            .await
            .and_then(decode);
        guard.release(self.config.close_timeout).await;

        outcome.map_err(|err| classify_failure(S::NAME, operation, &err, S::UNEXPECTED_FAILURE))
    }
}

impl<S: OneWayService> std::fmt::Debug for OneWayConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneWayConnection")
            .field("service", &S::NAME)
            .finish()
    }
}
