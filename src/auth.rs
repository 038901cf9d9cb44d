use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::decision::{DecisionKind, DecisionList};
use crate::descriptor::{ContentType, Descriptor};
use crate::util::lock_unpoisoned;

/// Where the client reads and persists tokens.
pub trait CredentialStore: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    fn save_access_token(&self, token: String);
}

#[derive(Debug, Default)]
struct Credentials {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Process-local [`CredentialStore`].
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<Credentials>,
}

impl MemoryCredentialStore {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            credentials: Mutex::new(Credentials {
                access_token: None,
                refresh_token: Some(refresh_token.into()),
            }),
        }
    }

    pub fn with_access_token(self, access_token: impl Into<String>) -> Self {
        lock_unpoisoned(&self.credentials).access_token = Some(access_token.into());
        self
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_token(&self) -> Option<String> {
        lock_unpoisoned(&self.credentials).access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        lock_unpoisoned(&self.credentials).refresh_token.clone()
    }

    fn save_access_token(&self, token: String) {
        lock_unpoisoned(&self.credentials).access_token = Some(token);
    }
}

/// Body of a successful refresh call.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RefreshTokenResponse {
    pub token: String,
}

/// Endpoint and store used by the `RefreshAuth` decision.
#[derive(Clone)]
pub struct AuthRefresh {
    refresh_url: String,
    store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for AuthRefresh {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AuthRefresh")
            .field("refresh_url", &self.refresh_url)
            .finish_non_exhaustive()
    }
}

impl AuthRefresh {
    pub fn new(refresh_url: impl Into<String>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            refresh_url: refresh_url.into(),
            store,
        }
    }

    pub fn refresh_url(&self) -> &str {
        &self.refresh_url
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// `POST {"refreshToken": ..}` as JSON; never refreshes recursively.
    pub fn refresh_descriptor(&self, refresh_token: &str) -> Descriptor<RefreshTokenResponse> {
        Descriptor::post(self.refresh_url.clone())
            .content_type(ContentType::Json)
            .parameter("refreshToken", refresh_token)
            .decisions(DecisionList::standard().without(DecisionKind::RefreshAuth))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::Method;
    use serde_json::{Value, json};

    use super::{AuthRefresh, CredentialStore, MemoryCredentialStore};
    use crate::decision::DecisionKind;

    #[test]
    fn memory_store_keeps_the_latest_access_token() {
        let store = MemoryCredentialStore::new("refresh-1").with_access_token("access-1");
        assert_eq!(store.access_token().as_deref(), Some("access-1"));
        store.save_access_token("access-2".to_owned());
        assert_eq!(store.access_token().as_deref(), Some("access-2"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn refresh_descriptor_posts_json_without_refreshing_itself() {
        let auth = AuthRefresh::new(
            "https://auth.example.com/token",
            Arc::new(MemoryCredentialStore::new("refresh-1")),
        );
        let descriptor = auth.refresh_descriptor("token123");

        assert_eq!(descriptor.method(), Method::POST);
        assert!(
            !descriptor
                .decision_list()
                .contains(DecisionKind::RefreshAuth)
        );
        let request = descriptor.build(None).expect("request builds");
        let body: Value = serde_json::from_slice(request.body()).expect("json body");
        assert_eq!(body, json!({"refreshToken": "token123"}));
    }
}
