use http::{Method, StatusCode};

use crate::decision::RestartReason;
use crate::error::Error;

/// Identity of one dispatch within a `send`.
#[derive(Clone, Debug)]
pub struct DispatchContext {
    method: Method,
    uri: String,
    run: usize,
}

impl DispatchContext {
    pub(crate) fn new(method: Method, uri: String, run: usize) -> Self {
        Self { method, uri, run }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request url with credentials, query and fragment stripped.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// 1 for the first dispatch, incremented by every restart.
    pub fn run(&self) -> usize {
        self.run
    }
}

/// Hooks around the pipeline, e.g. to drive a network activity indicator.
pub trait Observer: Send + Sync {
    fn on_dispatch(&self, _context: &DispatchContext) {}

    fn on_response(&self, _context: &DispatchContext, _status: StatusCode) {}

    fn on_restart(&self, _context: &DispatchContext, _reason: RestartReason) {}

    fn on_complete(&self, _context: &DispatchContext, _error: Option<&Error>) {}
}
