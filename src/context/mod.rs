//! Authentication context seam.
//!
//! The session delegates every identity-provider concern to an
//! [`AuthenticationContext`]: callback handling, the token cache and the
//! interactive redirect flows.

pub mod secure;
pub mod snapshot;
pub mod user;

use async_trait::async_trait;

use crate::error::ContextError;
use crate::navigation::{self, Navigation};

pub use secure::SecureString;
pub use snapshot::SnapshotContext;
pub use user::{CachedUser, UserProfile};

/// The external authentication library as seen by the session.
#[async_trait]
pub trait AuthenticationContext: Send + Sync {
    /// Whether `hash` is a redirect response from the identity provider.
    fn is_callback(&self, hash: &str) -> bool {
        navigation::is_callback_fragment(hash)
    }

    /// Complete a redirect response. Usually navigates away.
    fn handle_window_callback(&self, navigation: &Navigation);

    fn cached_user(&self) -> Option<CachedUser>;

    /// A valid, unexpired token for `resource`, if one is cached.
    fn cached_token(&self, resource: &str) -> Option<SecureString>;

    /// Acquire a token for `resource`, renewing it if the library can.
    async fn acquire_token(&self, resource: &str) -> Result<Option<SecureString>, ContextError>;

    /// Start an interactive redirect to obtain a token for `resource`.
    fn acquire_token_redirect(&self, resource: &str);

    /// Start an interactive sign-in.
    fn login(&self);

    /// Clear the cache and sign out at the identity provider.
    fn log_out(&self);
}
