use http::Method;
use thiserror::Error;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Tls,
    Read,
    Timeout,
    BodyTooLarge,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::Read => "read",
            Self::Timeout => "timeout",
            Self::BodyTooLarge => "body_too_large",
            Self::Other => "other",
        };
        formatter.write_str(text)
    }
}

/// Failure reported by a [`Transport`](crate::Transport) when no response was obtained.
#[derive(Debug, Error)]
#[error("{kind} transport failure: {source}")]
pub struct TransportError {
    kind: TransportErrorKind,
    #[source]
    source: BoxError,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn timeout(timeout_ms: u128) -> Self {
        Self::new(
            TransportErrorKind::Timeout,
            format!("no response within {timeout_ms}ms"),
        )
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub(crate) fn into_source(self) -> BoxError {
        self.source
    }
}

/// Coarse failure class of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// The outgoing request could not be built. Never retried.
    Encoding,
    /// No response was obtained from the transport.
    Transport,
    /// The server answered with a structured error body.
    Api,
    /// A response body could not be decoded.
    Decode,
    /// The nested token refresh call failed.
    AuthRefreshFailed,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Encoding => "encoding",
            Self::Transport => "transport",
            Self::Api => "api",
            Self::Decode => "decode",
            Self::AuthRefreshFailed => "auth_refresh_failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    InvalidUrl,
    SerializeJson,
    SerializeForm,
    InvalidParameters,
    InvalidHeaderName,
    InvalidHeaderValue,
    Adapter,
    Transport,
    Api,
    Decode,
    AuthRefreshFailed,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::SerializeJson => "serialize_json",
            Self::SerializeForm => "serialize_form",
            Self::InvalidParameters => "invalid_parameters",
            Self::InvalidHeaderName => "invalid_header_name",
            Self::InvalidHeaderValue => "invalid_header_value",
            Self::Adapter => "adapter",
            Self::Transport => "transport",
            Self::Api => "api",
            Self::Decode => "decode",
            Self::AuthRefreshFailed => "auth_refresh_failed",
        }
    }

    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::InvalidUrl
            | Self::SerializeJson
            | Self::SerializeForm
            | Self::InvalidParameters
            | Self::InvalidHeaderName
            | Self::InvalidHeaderValue
            | Self::Adapter => ErrorKind::Encoding,
            Self::Transport => ErrorKind::Transport,
            Self::Api => ErrorKind::Api,
            Self::Decode => ErrorKind::Decode,
            Self::AuthRefreshFailed => ErrorKind::AuthRefreshFailed,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid request url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to serialize request json: {source}")]
    SerializeJson {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize request form: {source}")]
    SerializeForm {
        #[source]
        source: serde_urlencoded::ser::Error,
    },
    #[error("request parameters must serialize to a json object, got {found}")]
    InvalidParameters { found: &'static str },
    #[error("invalid header name {name}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
    #[error("invalid header value for {name}: {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },
    #[error("request adapter {adapter} failed: {message}")]
    Adapter {
        adapter: String,
        message: String,
    },
    #[error("http transport error ({kind}) for {method} {uri}: {source}")]
    Transport {
        kind: TransportErrorKind,
        method: Method,
        uri: String,
        #[source]
        source: BoxError,
    },
    #[error("api error {code} (http {status}): {reason}")]
    Api {
        code: i64,
        reason: String,
        status: u16,
    },
    #[error("failed to decode response json: {source}; body={body}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },
    #[error("auth token refresh failed: {reason}")]
    AuthRefreshFailed {
        reason: String,
        #[source]
        source: Option<Box<Error>>,
    },
}

impl Error {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidUrl { .. } => ErrorCode::InvalidUrl,
            Self::SerializeJson { .. } => ErrorCode::SerializeJson,
            Self::SerializeForm { .. } => ErrorCode::SerializeForm,
            Self::InvalidParameters { .. } => ErrorCode::InvalidParameters,
            Self::InvalidHeaderName { .. } => ErrorCode::InvalidHeaderName,
            Self::InvalidHeaderValue { .. } => ErrorCode::InvalidHeaderValue,
            Self::Adapter { .. } => ErrorCode::Adapter,
            Self::Transport { .. } => ErrorCode::Transport,
            Self::Api { .. } => ErrorCode::Api,
            Self::Decode { .. } => ErrorCode::Decode,
            Self::AuthRefreshFailed { .. } => ErrorCode::AuthRefreshFailed,
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        self.code().kind()
    }

    /// Builds the error a [`Custom`](crate::RequestAdapter::Custom) adapter reports.
    pub fn adapter(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Adapter {
            adapter: adapter.into(),
            message: message.into(),
        }
    }

    pub(crate) fn transport(error: TransportError, method: &Method, uri: &str) -> Self {
        let kind = error.kind();
        Self::Transport {
            kind,
            method: method.clone(),
            uri: uri.to_owned(),
            source: error.into_source(),
        }
    }

    pub(crate) fn auth_refresh(reason: impl Into<String>, source: Option<Error>) -> Self {
        Self::AuthRefreshFailed {
            reason: reason.into(),
            source: source.map(Box::new),
        }
    }

    /// Status reported by the server for [`Error::Api`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn transport_error_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
