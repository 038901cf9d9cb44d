use std::sync::Arc;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use url::Url;

use crate::descriptor::{Parameters, RequestSpec};
use crate::error::Error;
use crate::util::{parameter_text, parse_header_value};

/// Outgoing request as assembled by the adapter chain.
#[derive(Clone, Debug)]
pub struct WireRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl WireRequest {
    /// A bodiless `GET` to `url` with no headers, the seed every adapter fold starts from.
    pub fn new(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub(crate) fn seed(url: &str) -> crate::Result<Self> {
        let parsed = Url::parse(url).map_err(|source| Error::InvalidUrl {
            url: url.to_owned(),
            source,
        })?;
        Ok(Self::new(parsed))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    pub fn into_parts(self) -> (Method, Url, HeaderMap, Bytes) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// What an adapter may read while it transforms a [`WireRequest`].
#[derive(Clone, Copy, Debug)]
pub struct AdapterContext<'a> {
    spec: &'a RequestSpec,
    access_token: Option<&'a str>,
}

impl<'a> AdapterContext<'a> {
    pub fn new(spec: &'a RequestSpec, access_token: Option<&'a str>) -> Self {
        Self { spec, access_token }
    }

    pub fn spec(&self) -> &'a RequestSpec {
        self.spec
    }

    pub fn access_token(&self) -> Option<&'a str> {
        self.access_token
    }
}

/// A user-supplied adapter step.
///
/// Implementations should be pure: the same context and request must always
/// produce the same output, since a restarted run rebuilds the request from
/// scratch.
pub trait AdaptRequest: Send + Sync {
    fn name(&self) -> &str {
        "custom"
    }

    fn adapt(&self, context: &AdapterContext<'_>, request: WireRequest)
    -> crate::Result<WireRequest>;
}

/// One step of the request-building chain.
#[derive(Clone)]
pub enum RequestAdapter {
    /// Sets the wire method from the descriptor.
    Method,
    /// `GET` encodes parameters as query items; other methods get a
    /// `Content-Type` header followed by an encoded body.
    Content,
    Query,
    ContentTypeHeader,
    /// JSON object or form body, chosen by the descriptor's content type.
    Body,
    Header(HeaderName, HeaderValue),
    /// `Authorization: Bearer <token>` when the credential store holds an access token.
    BearerAuth,
    Custom(Arc<dyn AdaptRequest>),
}

impl std::fmt::Debug for RequestAdapter {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header(name, _) => formatter.debug_tuple("Header").field(name).finish(),
            Self::Custom(adapter) => formatter.debug_tuple("Custom").field(&adapter.name()).finish(),
            other => formatter.write_str(other.name()),
        }
    }
}

impl RequestAdapter {
    /// `[Method, Content]`, the chain every descriptor starts with.
    pub fn standard() -> Vec<Self> {
        vec![Self::Method, Self::Content]
    }

    pub fn custom<A>(adapter: A) -> Self
    where
        A: AdaptRequest + 'static,
    {
        Self::Custom(Arc::new(adapter))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Method => "Method",
            Self::Content => "Content",
            Self::Query => "Query",
            Self::ContentTypeHeader => "ContentTypeHeader",
            Self::Body => "Body",
            Self::Header(..) => "Header",
            Self::BearerAuth => "BearerAuth",
            Self::Custom(adapter) => adapter.name(),
        }
    }

    pub fn adapt(
        &self,
        context: &AdapterContext<'_>,
        mut request: WireRequest,
    ) -> crate::Result<WireRequest> {
        let spec = context.spec();
        match self {
            Self::Method => {
                request.set_method(spec.method().clone());
                Ok(request)
            }
            Self::Content => {
                if spec.method() == Method::GET {
                    Self::Query.adapt(context, request)
                } else {
                    let request = Self::ContentTypeHeader.adapt(context, request)?;
                    Self::Body.adapt(context, request)
                }
            }
            Self::Query => {
                append_query_items(request.url_mut(), spec.parameters());
                Ok(request)
            }
            Self::ContentTypeHeader => {
                request
                    .headers_mut()
                    .insert(CONTENT_TYPE, spec.content_type().header_value());
                Ok(request)
            }
            Self::Body => {
                let body = spec.content_type().encode(spec.parameters())?;
                request.set_body(body);
                Ok(request)
            }
            Self::Header(name, value) => {
                request.headers_mut().insert(name.clone(), value.clone());
                Ok(request)
            }
            Self::BearerAuth => {
                if let Some(token) = context.access_token() {
                    let mut value =
                        parse_header_value(AUTHORIZATION.as_str(), &format!("Bearer {token}"))?;
                    value.set_sensitive(true);
                    request.headers_mut().insert(AUTHORIZATION, value);
                }
                Ok(request)
            }
            Self::Custom(adapter) => adapter.adapt(context, request),
        }
    }
}

fn append_query_items(url: &mut Url, parameters: &Parameters) {
    if parameters.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (name, value) in parameters {
        pairs.append_pair(name, &parameter_text(value));
    }
}

/// Folds `adapters` over a request seeded from the descriptor url.
pub(crate) fn build_wire_request(
    spec: &RequestSpec,
    adapters: &[RequestAdapter],
    access_token: Option<&str>,
) -> crate::Result<WireRequest> {
    let context = AdapterContext::new(spec, access_token);
    adapters
        .iter()
        .try_fold(WireRequest::seed(spec.url())?, |request, adapter| {
            adapter.adapt(&context, request)
        })
}
