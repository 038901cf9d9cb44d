//! `reqflow` is a descriptor-driven HTTP request pipeline for API SDKs.
//!
//! A [`Descriptor`] names an endpoint, its parameters and two chains: the
//! adapter chain turns it into a wire request, and the decision chain turns
//! the response into a typed value, an error, or a restart of the whole
//! pipeline (after a token refresh or for a retry).
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use reqflow::prelude::{
//!     AuthRefresh, Client, ContentType, Descriptor, HyperTransport, MemoryCredentialStore,
//! };
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Profile {
//!     id: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryCredentialStore::new("refresh-token"));
//!     let client = Client::builder(HyperTransport::try_new()?)
//!         .client_name("my-sdk")
//!         .request_timeout(Duration::from_secs(3))
//!         .auth_refresh(AuthRefresh::new("https://api.example.com/v1/token", store))
//!         .build();
//!
//!     let profile: Profile = client
//!         .send(
//!             &Descriptor::post("https://api.example.com/v1/profile")
//!                 .content_type(ContentType::UrlForm)
//!                 .parameter("fields", "id")
//!                 .authorized(),
//!         )
//!         .await?;
//!
//!     println!("profile id={}", profile.id);
//!     Ok(())
//! }
//! ```
//!
//! # Default Chains
//!
//! - Adapters: `[Method, Content]`. `GET` parameters go to the query string,
//!   everything else to a JSON or form body.
//! - Decisions: `[RefreshAuth, Retry(2), ValidateStatus, NormalizePayload, ParseResult]`.

mod adapter;
mod auth;
mod chain;
mod client;
mod config;
mod decision;
mod descriptor;
mod error;
mod metrics;
mod observe;
mod response;
mod transport;
mod util;

pub use crate::adapter::{AdaptRequest, AdapterContext, RequestAdapter, WireRequest};
pub use crate::auth::{AuthRefresh, CredentialStore, MemoryCredentialStore, RefreshTokenResponse};
pub use crate::chain::ApiErrorBody;
pub use crate::client::{Client, ClientBuilder};
pub use crate::config::ClientConfig;
pub use crate::decision::{Decision, DecisionKind, DecisionList, EMPTY_OBJECT, RestartReason};
pub use crate::descriptor::{ContentType, Descriptor, Parameters, RequestSpec};
pub use crate::error::{Error, ErrorCode, ErrorKind, TransportError, TransportErrorKind};
pub use crate::metrics::ClientMetricsSnapshot;
pub use crate::observe::{DispatchContext, Observer};
pub use crate::response::ResponseContext;
pub use crate::transport::Transport;
#[cfg(feature = "hyper-transport")]
pub use crate::transport::{HyperTransport, HyperTransportBuilder};

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::{
        AdaptRequest, AdapterContext, AuthRefresh, Client, ClientBuilder, ClientConfig,
        ClientMetricsSnapshot, ContentType, CredentialStore, Decision, DecisionKind, DecisionList,
        Descriptor, DispatchContext, Error, ErrorCode, ErrorKind, MemoryCredentialStore, Observer,
        RequestAdapter, ResponseContext, RestartReason, Transport, TransportError,
        TransportErrorKind, WireRequest,
    };
    #[cfg(feature = "hyper-transport")]
    pub use crate::{HyperTransport, HyperTransportBuilder};
}

#[cfg(test)]
mod tests;
