use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use http::header::{HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{Instrument, debug, info_span, warn};

use crate::auth::AuthRefresh;
use crate::chain::{RunOutcome, run_decisions};
use crate::config::ClientConfig;
use crate::decision::{DecisionList, RestartReason};
use crate::descriptor::Descriptor;
use crate::error::{Error, ErrorKind, TransportError};
use crate::metrics::{ClientMetrics, ClientMetricsSnapshot};
use crate::observe::{DispatchContext, Observer};
use crate::response::ResponseContext;
use crate::transport::Transport;
use crate::util::{merge_default_headers, parse_header_name, parse_header_value, redact_uri_for_logs};

pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    auth: Option<AuthRefresh>,
    observer: Option<Arc<dyn Observer>>,
}

impl ClientBuilder {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: ClientConfig::default(),
            auth: None,
            observer: None,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn client_name(mut self, client_name: impl Into<String>) -> Self {
        self.config = self.config.with_client_name(client_name);
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.config = self.config.with_request_timeout(request_timeout);
        self
    }

    pub fn retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.config = self.config.with_retry_backoff(retry_backoff);
        self
    }

    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.config = self.config.with_default_header(name, value);
        self
    }

    pub fn try_default_header(self, name: &str, value: &str) -> crate::Result<Self> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.default_header(name, value))
    }

    pub fn metrics_enabled(mut self, enabled: bool) -> Self {
        self.config = self.config.with_metrics_enabled(enabled);
        self
    }

    pub fn auth_refresh(mut self, auth: AuthRefresh) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn observer_arc(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn observer<O>(self, observer: O) -> Self
    where
        O: Observer + 'static,
    {
        self.observer_arc(Arc::new(observer))
    }

    pub fn build(self) -> Client {
        let metrics = if self.config.metrics_enabled {
            ClientMetrics::enabled()
        } else {
            ClientMetrics::disabled()
        };
        Client {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                config: self.config,
                auth: self.auth,
                observer: self.observer,
                metrics,
            }),
        }
    }
}

/// Builds, dispatches and adjudicates descriptor calls.
///
/// Cloning is cheap; clones share the transport, configuration and metrics.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    auth: Option<AuthRefresh>,
    observer: Option<Arc<dyn Observer>>,
    metrics: ClientMetrics,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Client")
            .field("config", &self.inner.config)
            .field("auth", &self.inner.auth)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn builder<T>(transport: T) -> ClientBuilder
    where
        T: Transport + 'static,
    {
        ClientBuilder::new(Arc::new(transport))
    }

    pub fn new<T>(transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self::builder(transport).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn metrics_snapshot(&self) -> ClientMetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Builds, dispatches and adjudicates `descriptor`, restarting as its decisions direct.
    ///
    /// # Errors
    ///
    /// Returns the terminal error of the last run: an encoding error before
    /// anything is dispatched, a transport error, the API error reported by
    /// `ValidateStatus`, a decode error, or a failed token refresh.
    ///
    /// # Panics
    ///
    /// Panics if a run exhausts its decision list without reaching a terminal
    /// decision.
    pub async fn send<R>(&self, descriptor: &Descriptor<R>) -> crate::Result<R>
    where
        R: DeserializeOwned + Send,
    {
        let uri = redact_uri_for_logs(descriptor.url());
        let span = info_span!(
            "reqflow.send",
            client = %self.inner.config.client_name,
            method = %descriptor.method(),
            uri = %uri,
        );
        self.execute(descriptor, uri).instrument(span).await
    }

    /// Runs [`send`](Self::send) on the tokio runtime and hands the result to `handler`.
    ///
    /// `handler` is called exactly once, on whichever worker finishes the call.
    pub fn send_with<R, F>(&self, descriptor: Descriptor<R>, handler: F) -> JoinHandle<()>
    where
        R: DeserializeOwned + Send + 'static,
        F: FnOnce(crate::Result<R>) + Send + 'static,
    {
        let client = self.clone();
        tokio::spawn(async move {
            let result = client.send(&descriptor).await;
            handler(result);
        })
    }

    async fn execute<R>(&self, descriptor: &Descriptor<R>, uri: String) -> crate::Result<R>
    where
        R: DeserializeOwned + Send,
    {
        let metrics = &self.inner.metrics;
        metrics.record_send_started();
        let _in_flight = metrics.enter_in_flight();
        let started_at = Instant::now();

        let mut decisions = descriptor.decision_list().clone();
        let mut context = DispatchContext::new(descriptor.method().clone(), uri, 1);
        let result = loop {
            let (next, reason) = match self.dispatch(descriptor, &context).await {
                Ok(response) => match run_decisions::<R>(self, &decisions, response).await {
                    RunOutcome::Finished(result) => break result,
                    RunOutcome::Restart(next, reason) => (next, reason),
                },
                Err(error) => match transport_retry(descriptor, &decisions, &error) {
                    Some((next, remaining)) => {
                        self.wait_retry_backoff(&error, remaining).await;
                        (next, RestartReason::TransportRetry { remaining })
                    }
                    None => break Err(error),
                },
            };

            debug!(run = context.run(), ?reason, "restarting pipeline");
            metrics.record_restart(reason);
            if let Some(observer) = &self.inner.observer {
                observer.on_restart(&context, reason);
            }
            decisions = next;
            context = DispatchContext::new(
                context.method().clone(),
                context.uri().to_owned(),
                context.run() + 1,
            );
        };

        metrics.record_send_completed(&result, started_at.elapsed());
        if let Some(observer) = &self.inner.observer {
            observer.on_complete(&context, result.as_ref().err());
        }
        result
    }

    async fn dispatch<R>(
        &self,
        descriptor: &Descriptor<R>,
        context: &DispatchContext,
    ) -> crate::Result<ResponseContext> {
        let access_token = self
            .inner
            .auth
            .as_ref()
            .and_then(|auth| auth.store().access_token());
        let mut request = descriptor.build(access_token.as_deref())?;
        merge_default_headers(request.headers_mut(), &self.inner.config.default_headers);
        let method = request.method().clone();

        if let Some(observer) = &self.inner.observer {
            observer.on_dispatch(context);
        }
        self.inner.metrics.record_dispatch();
        debug!(run = context.run(), "dispatching request");

        let request_timeout = self.inner.config.request_timeout;
        let outcome = match timeout(request_timeout, self.inner.transport.dispatch(request)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::timeout(request_timeout.as_millis())),
        };
        match outcome {
            Ok(response) => {
                debug!(status = response.status().as_u16(), "response received");
                self.inner.metrics.record_status(response.status());
                if let Some(observer) = &self.inner.observer {
                    observer.on_response(context, response.status());
                }
                Ok(response)
            }
            Err(error) => {
                warn!(error = %error, "transport failed");
                Err(Error::transport(error, &method, context.uri()))
            }
        }
    }

    async fn wait_retry_backoff(&self, error: &Error, remaining: usize) {
        let backoff = self.inner.config.retry_backoff;
        warn!(
            remaining,
            delay_ms = backoff.as_millis() as u64,
            error = %error,
            "retrying request after transport error"
        );
        if !backoff.is_zero() {
            tokio::time::sleep(backoff).await;
        }
    }

    /// Nested refresh call through the regular `send` path.
    ///
    /// Boxed because it re-enters `send`, which may itself reach this method.
    pub(crate) fn refresh_credentials(&self) -> BoxFuture<'_, crate::Result<()>> {
        Box::pin(async move {
            let Some(auth) = &self.inner.auth else {
                return Err(Error::auth_refresh("auth refresh is not configured", None));
            };
            let Some(refresh_token) = auth.store().refresh_token() else {
                return Err(Error::auth_refresh("no refresh token available", None));
            };

            self.inner.metrics.record_auth_refresh();
            let descriptor = auth.refresh_descriptor(&refresh_token);
            match self.send(&descriptor).await {
                Ok(response) => {
                    auth.store().save_access_token(response.token);
                    debug!("access token refreshed");
                    Ok(())
                }
                Err(error) => Err(Error::auth_refresh("refresh call failed", Some(error))),
            }
        })
    }
}

/// The restart list for a transport failure, if the descriptor opted in and retries remain.
fn transport_retry<R>(
    descriptor: &Descriptor<R>,
    decisions: &DecisionList,
    error: &Error,
) -> Option<(DecisionList, usize)> {
    if error.kind() != ErrorKind::Transport || !descriptor.retries_transport_errors() {
        return None;
    }
    decisions.after_retry()
}
