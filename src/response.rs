use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::util::truncate_body;

/// Status, headers and body of one dispatched request, as seen by the decision chain.
#[derive(Clone, Debug)]
pub struct ResponseContext {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ResponseContext {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Same status and headers with `body` in place of the current one.
    pub fn with_body(&self, body: impl Into<Bytes>) -> Self {
        Self {
            status: self.status,
            headers: self.headers.clone(),
            body: body.into(),
        }
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T>(&self) -> crate::Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(&self.body).map_err(|source| Error::Decode {
            source,
            body: truncate_body(&self.body),
        })
    }
}
