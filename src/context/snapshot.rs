//! Authentication context backed by an exported browser-storage snapshot.
//!
//! Reads the cache exactly as the authentication library left it. Interactive
//! flows are handed to a [`Navigator`]; the snapshot itself is never written.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use tracing::{debug, info, warn};

use super::{AuthenticationContext, CachedUser, SecureString};
use crate::config::Config;
use crate::error::ContextError;
use crate::navigation::Navigation;
use crate::navigator::{NavigationRequest, Navigator};
use crate::storage::{self, StorageSnapshot};

pub struct SnapshotContext<N> {
    config: Config,
    snapshot: StorageSnapshot,
    navigator: N,
}

impl<N: Navigator> SnapshotContext<N> {
    pub fn new(config: Config, snapshot: StorageSnapshot, navigator: N) -> Self {
        Self {
            config,
            snapshot,
            navigator,
        }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    fn item(&self, key: &str) -> Option<&str> {
        self.snapshot.get(self.config.adal.cache_location, key)
    }

    fn navigate(&self, request: NavigationRequest) {
        let target = match request.to_url(&self.config) {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot navigate for {:?}: {}", request, e);
                return;
            }
        };

        if let Err(e) = self.navigator.navigate(&target) {
            warn!("Navigation to {} failed: {}", target, e);
        }
    }
}

#[async_trait]
impl<N: Navigator> AuthenticationContext for SnapshotContext<N> {
    fn handle_window_callback(&self, navigation: &Navigation) {
        if let Some(error) = self.item(storage::KEY_ERROR) {
            warn!(
                "Identity provider reported {}: {}",
                error,
                self.item(storage::KEY_ERROR_DESCRIPTION).unwrap_or("")
            );
        }

        if navigation.is_embedded() {
            info!("Callback handled inside a frame; completion goes to the parent window");
            return;
        }

        let start_page = self
            .item(storage::KEY_LOGIN_REQUEST)
            .unwrap_or(self.config.adal.redirect_uri.as_str())
            .to_string();
        debug!("Returning to {}", start_page);
        self.navigate(NavigationRequest::Return { url: start_page });
    }

    fn cached_user(&self) -> Option<CachedUser> {
        let id_token = self.item(storage::KEY_ID_TOKEN)?;

        match CachedUser::from_id_token(id_token, &self.config.adal.client_id) {
            Ok(user) => user,
            Err(e) => {
                warn!("Ignoring cached id token: {}", e);
                None
            }
        }
    }

    fn cached_token(&self, resource: &str) -> Option<SecureString> {
        let token = self.item(&storage::access_token_key(resource))?;
        let expiry: i64 = self
            .item(&storage::expiration_key(resource))?
            .parse()
            .ok()?;
        let expires_at = Utc.timestamp_opt(expiry, 0).single()?;
        let offset = Duration::seconds(self.config.adal.expire_offset_seconds);

        if expires_at > Utc::now() + offset {
            Some(SecureString::from(token))
        } else {
            debug!("Cached token for {} expired at {}", resource, expires_at);
            None
        }
    }

    async fn acquire_token(&self, resource: &str) -> Result<Option<SecureString>, ContextError> {
        if let Some(token) = self.cached_token(resource) {
            return Ok(Some(token));
        }

        if self.cached_user().is_none() {
            return Err(ContextError::new("login_required")
                .with_description("User login is required"));
        }

        Err(ContextError::new("token_renewal_unavailable").with_description(format!(
            "No valid token cached for {resource} and silent renewal is not available"
        )))
    }

    fn acquire_token_redirect(&self, resource: &str) {
        self.navigate(NavigationRequest::TokenRedirect {
            resource: resource.to_string(),
        });
    }

    fn login(&self) {
        self.navigate(NavigationRequest::Login);
    }

    fn log_out(&self) {
        self.navigate(NavigationRequest::Logout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::context::user::make_id_token;
    use crate::navigation::FrameEmbedding;
    use crate::navigator::testing::RecordingNavigator;
    use crate::storage::CacheLocation;
    use crate::error::NavigationError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    const RESOURCE: &str = "https://api.example.com";

    fn snapshot_with_user() -> StorageSnapshot {
        let mut snapshot = StorageSnapshot::default();
        let id_token = make_id_token(&json!({ "aud": "test-client", "upn": "john@example.com" }));
        snapshot.insert(CacheLocation::LocalStorage, storage::KEY_ID_TOKEN, &id_token);
        snapshot
    }

    fn with_token(mut snapshot: StorageSnapshot, expires_in: i64) -> StorageSnapshot {
        let expiry = (Utc::now() + Duration::seconds(expires_in)).timestamp();
        snapshot.insert(
            CacheLocation::LocalStorage,
            &storage::access_token_key(RESOURCE),
            "access-token",
        );
        snapshot.insert(
            CacheLocation::LocalStorage,
            &storage::expiration_key(RESOURCE),
            &expiry.to_string(),
        );
        snapshot
    }

    fn context(snapshot: StorageSnapshot) -> SnapshotContext<RecordingNavigator> {
        SnapshotContext::new(test_config(), snapshot, RecordingNavigator::default())
    }

    #[test]
    fn test_cached_user() {
        let ctx = context(snapshot_with_user());
        let user = ctx.cached_user().expect("user should be cached");
        assert_eq!(user.user_name, "john@example.com");

        let ctx = context(StorageSnapshot::default());
        assert!(ctx.cached_user().is_none());
    }

    #[test]
    fn test_cache_location_is_respected() {
        let mut config = test_config();
        config.adal.cache_location = CacheLocation::SessionStorage;
        let ctx = SnapshotContext::new(config, snapshot_with_user(), RecordingNavigator::default());
        assert!(ctx.cached_user().is_none());
    }

    #[test]
    fn test_corrupt_id_token_is_ignored() {
        let mut snapshot = StorageSnapshot::default();
        snapshot.insert(CacheLocation::LocalStorage, storage::KEY_ID_TOKEN, "garbage");
        assert!(context(snapshot).cached_user().is_none());
    }

    #[test]
    fn test_cached_token_expiry_offset() {
        let ctx = context(with_token(snapshot_with_user(), 3600));
        assert_eq!(
            ctx.cached_token(RESOURCE).map(|t| t.as_str().to_string()),
            Some("access-token".to_string())
        );

        // Inside the 300 second offset counts as expired
        let ctx = context(with_token(snapshot_with_user(), 120));
        assert!(ctx.cached_token(RESOURCE).is_none());

        let ctx = context(with_token(snapshot_with_user(), -60));
        assert!(ctx.cached_token(RESOURCE).is_none());
        assert!(ctx.cached_token("https://other").is_none());
    }

    #[tokio::test]
    async fn test_acquire_token() {
        let ctx = context(with_token(snapshot_with_user(), 3600));
        let token = ctx.acquire_token(RESOURCE).await.unwrap();
        assert_eq!(token.unwrap().as_str(), "access-token");

        let ctx = context(StorageSnapshot::default());
        let err = ctx.acquire_token(RESOURCE).await.unwrap_err();
        assert!(err.is_login_required());

        let ctx = context(snapshot_with_user());
        let err = ctx.acquire_token(RESOURCE).await.unwrap_err();
        assert_eq!(err.code, "token_renewal_unavailable");
    }

    #[test]
    fn test_callback_returns_to_start_page() {
        let mut snapshot = StorageSnapshot::default();
        snapshot.insert(
            CacheLocation::LocalStorage,
            storage::KEY_LOGIN_REQUEST,
            "http://localhost:8080/orders",
        );
        let ctx = context(snapshot);
        let url = Url::parse("http://localhost:8080/#id_token=abc").unwrap();

        ctx.handle_window_callback(&Navigation::top_level(url.clone()));
        let visited = ctx.navigator().visited();
        assert_eq!(visited.len(), 1);
        assert_eq!(visited[0].as_str(), "http://localhost:8080/orders");

        ctx.handle_window_callback(&Navigation::new(url, FrameEmbedding::Embedded));
        assert_eq!(ctx.navigator().visited().len(), 1);
    }

    /// Navigator whose every attempt fails.
    #[derive(Default)]
    struct FailingNavigator {
        attempts: AtomicUsize,
    }

    impl Navigator for FailingNavigator {
        fn navigate(&self, _target: &Url) -> Result<(), NavigationError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(NavigationError::OpenFailed("no browser".into()))
        }
    }

    #[test]
    fn test_failed_navigation_does_not_propagate() {
        let ctx = SnapshotContext::new(
            test_config(),
            StorageSnapshot::default(),
            FailingNavigator::default(),
        );

        ctx.login();
        ctx.log_out();

        assert_eq!(ctx.navigator().attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_interactive_flows_navigate() {
        let ctx = context(StorageSnapshot::default());
        ctx.login();
        ctx.acquire_token_redirect(RESOURCE);
        ctx.log_out();

        let visited = ctx.navigator().visited();
        assert_eq!(visited.len(), 3);
        assert!(visited[0].path().ends_with("/oauth2/authorize"));
        assert!(visited[1].query().unwrap_or("").contains("response_type=token"));
        assert!(visited[2].path().ends_with("/oauth2/logout"));
    }
}
