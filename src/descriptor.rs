use std::marker::PhantomData;

use bytes::Bytes;
use http::Method;
use http::header::{HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use crate::adapter::{RequestAdapter, WireRequest, build_wire_request};
use crate::decision::DecisionList;
use crate::error::Error;
use crate::util::{json_type_name, parameter_text, parse_header_name, parse_header_value};

/// Request parameters keyed by name, encoded by the adapter chain.
pub type Parameters = serde_json::Map<String, Value>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContentType {
    #[default]
    Json,
    UrlForm,
}

impl ContentType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::UrlForm => "application/x-www-form-urlencoded; charset=utf-8",
        }
    }

    pub fn header_value(self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }

    pub(crate) fn encode(self, parameters: &Parameters) -> crate::Result<Bytes> {
        match self {
            Self::Json => serde_json::to_vec(parameters)
                .map(Bytes::from)
                .map_err(|source| Error::SerializeJson { source }),
            Self::UrlForm => {
                let pairs: Vec<(&str, String)> = parameters
                    .iter()
                    .map(|(name, value)| (name.as_str(), parameter_text(value)))
                    .collect();
                serde_urlencoded::to_string(pairs)
                    .map(Bytes::from)
                    .map_err(|source| Error::SerializeForm { source })
            }
        }
    }
}

/// The untyped part of a descriptor: everything adapters need to build a request.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSpec {
    url: String,
    method: Method,
    parameters: Parameters,
    content_type: ContentType,
}

impl RequestSpec {
    pub fn new(
        method: Method,
        url: impl Into<String>,
        parameters: Parameters,
        content_type: ContentType,
    ) -> Self {
        Self {
            url: url.into(),
            method,
            parameters,
            content_type,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }
}

/// Declarative description of one endpoint call whose response decodes into `R`.
///
/// ```
/// use reqflow::{ContentType, Descriptor};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Form {
///     foo: String,
/// }
///
/// #[derive(Debug, Deserialize)]
/// struct PostResponse {
///     form: Form,
/// }
///
/// let descriptor = Descriptor::<PostResponse>::post("https://httpbin.org/post")
///     .content_type(ContentType::UrlForm)
///     .parameter("foo", "bar");
/// let request = descriptor.build(None).expect("request builds");
/// assert_eq!(request.body().as_ref(), b"foo=bar");
/// ```
pub struct Descriptor<R> {
    spec: RequestSpec,
    adapters: Vec<RequestAdapter>,
    decisions: DecisionList,
    retry_transport_errors: bool,
    response: PhantomData<fn() -> R>,
}

impl<R> Clone for Descriptor<R> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            adapters: self.adapters.clone(),
            decisions: self.decisions.clone(),
            retry_transport_errors: self.retry_transport_errors,
            response: PhantomData,
        }
    }
}

impl<R> std::fmt::Debug for Descriptor<R> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Descriptor")
            .field("spec", &self.spec)
            .field("adapters", &self.adapters)
            .field("decisions", &self.decisions)
            .field("retry_transport_errors", &self.retry_transport_errors)
            .field("response", &std::any::type_name::<R>())
            .finish()
    }
}

impl<R> Descriptor<R> {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            spec: RequestSpec::new(method, url, Parameters::new(), ContentType::default()),
            adapters: RequestAdapter::standard(),
            decisions: DecisionList::standard(),
            retry_transport_errors: false,
            response: PhantomData,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.spec.parameters.insert(name.into(), value.into());
        self
    }

    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.spec.parameters = parameters;
        self
    }

    /// Replaces the parameters with the fields of `payload`, which must serialize to a JSON object.
    pub fn try_parameters<T>(self, payload: &T) -> crate::Result<Self>
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_value(payload).map_err(|source| Error::SerializeJson { source })? {
            Value::Object(parameters) => Ok(self.parameters(parameters)),
            other => Err(Error::InvalidParameters {
                found: json_type_name(&other),
            }),
        }
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.spec.content_type = content_type;
        self
    }

    /// Appends a fixed header step to the adapter chain.
    pub fn header(self, name: HeaderName, value: HeaderValue) -> Self {
        self.adapter(RequestAdapter::Header(name, value))
    }

    pub fn try_header(self, name: &str, value: &str) -> crate::Result<Self> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.header(name, value))
    }

    /// Appends [`RequestAdapter::BearerAuth`] so the stored access token is sent.
    pub fn authorized(self) -> Self {
        self.adapter(RequestAdapter::BearerAuth)
    }

    pub fn adapter(mut self, adapter: RequestAdapter) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Replaces the whole adapter chain, including the standard steps.
    pub fn adapters(mut self, adapters: Vec<RequestAdapter>) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn decisions(mut self, decisions: DecisionList) -> Self {
        self.decisions = decisions;
        self
    }

    /// Lets a configured `Retry` decision also cover transport failures.
    pub fn retry_transport_errors(mut self, enabled: bool) -> Self {
        self.retry_transport_errors = enabled;
        self
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    pub fn url(&self) -> &str {
        self.spec.url()
    }

    pub fn method(&self) -> &Method {
        self.spec.method()
    }

    pub fn adapter_list(&self) -> &[RequestAdapter] {
        &self.adapters
    }

    pub fn decision_list(&self) -> &DecisionList {
        &self.decisions
    }

    pub fn retries_transport_errors(&self) -> bool {
        self.retry_transport_errors
    }

    /// Runs the adapter chain and returns the request that would be dispatched.
    pub fn build(&self, access_token: Option<&str>) -> crate::Result<WireRequest> {
        build_wire_request(&self.spec, &self.adapters, access_token)
    }
}
