use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::adapter::WireRequest;
use crate::error::TransportError;
use crate::response::ResponseContext;

/// Issues one wire request and returns the raw response.
///
/// Implementations must tolerate concurrent calls; the client shares a single
/// handle across every `send`.
pub trait Transport: Send + Sync {
    fn dispatch(
        &self,
        request: WireRequest,
    ) -> BoxFuture<'_, Result<ResponseContext, TransportError>>;
}

impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    fn dispatch(
        &self,
        request: WireRequest,
    ) -> BoxFuture<'_, Result<ResponseContext, TransportError>> {
        (**self).dispatch(request)
    }
}

#[cfg(feature = "hyper-transport")]
pub use self::hyper_transport::{HyperTransport, HyperTransportBuilder};

#[cfg(feature = "hyper-transport")]
mod hyper_transport {
    use std::time::Duration;

    use bytes::Bytes;
    use futures_util::future::BoxFuture;
    use http::{Request, Uri};
    use http_body_util::{BodyExt, Full};
    use hyper::body::Incoming;
    use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
    use hyper_util::client::legacy::Client;
    use hyper_util::client::legacy::connect::HttpConnector;
    use hyper_util::rt::{TokioExecutor, TokioTimer};

    use super::Transport;
    use crate::adapter::WireRequest;
    use crate::error::{TransportError, TransportErrorKind};
    use crate::response::ResponseContext;
    use crate::util::classify_transport_error;

    const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
    const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 8;
    const DEFAULT_MAX_RESPONSE_BODY_BYTES: usize = 8 * 1024 * 1024;

    type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

    /// HTTP/1.1 transport over hyper with rustls for `https` urls.
    #[derive(Clone)]
    pub struct HyperTransport {
        client: HyperClient,
        max_response_body_bytes: usize,
    }

    impl std::fmt::Debug for HyperTransport {
        fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter
                .debug_struct("HyperTransport")
                .field("max_response_body_bytes", &self.max_response_body_bytes)
                .finish_non_exhaustive()
        }
    }

    #[derive(Clone, Debug)]
    pub struct HyperTransportBuilder {
        connect_timeout: Duration,
        pool_idle_timeout: Duration,
        pool_max_idle_per_host: usize,
        max_response_body_bytes: usize,
    }

    impl Default for HyperTransportBuilder {
        fn default() -> Self {
            Self {
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
                pool_idle_timeout: DEFAULT_POOL_IDLE_TIMEOUT,
                pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
                max_response_body_bytes: DEFAULT_MAX_RESPONSE_BODY_BYTES,
            }
        }
    }

    impl HyperTransportBuilder {
        pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
            self.connect_timeout = connect_timeout.max(Duration::from_millis(1));
            self
        }

        pub fn pool_idle_timeout(mut self, pool_idle_timeout: Duration) -> Self {
            self.pool_idle_timeout = pool_idle_timeout;
            self
        }

        pub fn pool_max_idle_per_host(mut self, pool_max_idle_per_host: usize) -> Self {
            self.pool_max_idle_per_host = pool_max_idle_per_host;
            self
        }

        pub fn max_response_body_bytes(mut self, max_response_body_bytes: usize) -> Self {
            self.max_response_body_bytes = max_response_body_bytes.max(1);
            self
        }

        pub fn try_build(self) -> Result<HyperTransport, TransportError> {
            let mut http = HttpConnector::new();
            http.enforce_http(false);
            http.set_connect_timeout(Some(self.connect_timeout));
            let https = HttpsConnectorBuilder::new()
                .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
                .map_err(|source| TransportError::new(TransportErrorKind::Tls, source))?
                .https_or_http()
                .enable_http1()
                .wrap_connector(http);
            let client = Client::builder(TokioExecutor::new())
                .pool_timer(TokioTimer::new())
                .pool_idle_timeout(self.pool_idle_timeout)
                .pool_max_idle_per_host(self.pool_max_idle_per_host)
                .build(https);
            Ok(HyperTransport {
                client,
                max_response_body_bytes: self.max_response_body_bytes,
            })
        }
    }

    impl HyperTransport {
        pub fn builder() -> HyperTransportBuilder {
            HyperTransportBuilder::default()
        }

        pub fn try_new() -> Result<Self, TransportError> {
            Self::builder().try_build()
        }

        async fn execute(&self, request: WireRequest) -> Result<ResponseContext, TransportError> {
            let (method, url, headers, body) = request.into_parts();
            let uri: Uri = url
                .as_str()
                .parse()
                .map_err(|source: http::uri::InvalidUri| {
                    TransportError::new(TransportErrorKind::Other, source)
                })?;
            let mut request_builder = Request::builder().method(method).uri(uri);
            for (name, value) in &headers {
                request_builder = request_builder.header(name, value);
            }
            let request = request_builder
                .body(Full::new(body))
                .map_err(|source| TransportError::new(TransportErrorKind::Other, source))?;

            let response = self.client.request(request).await.map_err(|source| {
                let kind = classify_transport_error(&source);
                TransportError::new(kind, source)
            })?;
            let (parts, body) = response.into_parts();
            let body = read_body_limited(body, self.max_response_body_bytes).await?;
            Ok(ResponseContext::new(parts.status, parts.headers, body))
        }
    }

    impl Transport for HyperTransport {
        fn dispatch(
            &self,
            request: WireRequest,
        ) -> BoxFuture<'_, Result<ResponseContext, TransportError>> {
            Box::pin(self.execute(request))
        }
    }

    async fn read_body_limited(
        mut body: Incoming,
        max_bytes: usize,
    ) -> Result<Bytes, TransportError> {
        let mut collected = Vec::new();

        while let Some(frame) = body.frame().await {
            let frame =
                frame.map_err(|source| TransportError::new(TransportErrorKind::Read, source))?;
            if let Some(data) = frame.data_ref() {
                let total_len = collected.len().saturating_add(data.len());
                if total_len > max_bytes {
                    return Err(TransportError::new(
                        TransportErrorKind::BodyTooLarge,
                        format!("response body exceeds {max_bytes} bytes"),
                    ));
                }
                collected.extend_from_slice(data);
            }
        }

        Ok(Bytes::from(collected))
    }
}
