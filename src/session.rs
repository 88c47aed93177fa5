//! Session bootstrapper.
//!
//! [`AuthSession`] owns the authentication context for the lifetime of the
//! application and is shared by reference (`Arc<AuthSession<_>>`). Every
//! operation delegates to the context; the session only decides *which*
//! context entry point a page load needs.

use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::context::{AuthenticationContext, SecureString, UserProfile};
use crate::error::AuthError;
use crate::navigation::Navigation;

/// How [`AuthSession`] hands out the user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileMode {
    /// Read the cached user's profile directly.
    #[default]
    Cached,
    /// Initialize the session on first request and remember the outcome.
    Memoized,
}

/// Immutable settings for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Application client id; cached tokens are looked up under it.
    pub client_id: String,
    /// Resource that access tokens are requested for.
    pub resource: String,
    /// Treat any page loaded inside a frame as a callback.
    pub frame_detection: bool,
    pub profile_mode: ProfileMode,
}

/// Outcome of [`AuthSession::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    /// A cached user was found.
    Established,
    /// No user was cached; interactive sign-in has been started.
    SignInStarted,
    /// The page load was a redirect callback and the context took it over.
    /// The session state is decided by the context, not by this page load.
    CallbackHandled,
}

impl Bootstrap {
    /// Whether the page can go on rendering as signed in.
    pub fn is_established(&self) -> bool {
        matches!(self, Self::Established)
    }
}

pub struct AuthSession<C> {
    context: C,
    options: SessionOptions,
    initialized: OnceCell<Bootstrap>,
}

impl<C: AuthenticationContext> AuthSession<C> {
    /// Wrap `context`. The session owns the only instance.
    pub fn new(context: C, options: SessionOptions) -> Self {
        Self {
            context,
            options,
            initialized: OnceCell::new(),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// Decide the session state for a page load.
    ///
    /// Callback loads (and, with frame detection on, any framed load) are
    /// handed to the context without looking at the cache. Otherwise a cached
    /// user establishes the session and a missing one starts sign-in.
    pub async fn initialize(&self, navigation: &Navigation) -> Bootstrap {
        let hash = navigation.hash();
        let framed = self.options.frame_detection && navigation.is_embedded();

        if self.context.is_callback(&hash) || framed {
            info!(framed, "Handing redirect callback to the authentication context");
            self.context.handle_window_callback(navigation);
            return Bootstrap::CallbackHandled;
        }

        match self.context.cached_user() {
            Some(user) => {
                info!("Session established for {}", user.user_name);
                Bootstrap::Established
            }
            None => {
                info!("No cached user, starting sign-in");
                self.sign_in();
                Bootstrap::SignInStarted
            }
        }
    }

    /// Acquire an access token for the configured resource.
    pub async fn acquire_token(&self) -> Result<SecureString, AuthError> {
        debug!("Acquiring token for {}", self.options.resource);

        match self.context.acquire_token(&self.options.resource).await {
            Ok(Some(token)) if !token.is_empty() => Ok(token),
            Ok(_) => {
                warn!("Authentication context returned no token");
                Err(AuthError::NoToken)
            }
            Err(e) => {
                warn!("Token acquisition failed: {}", e);
                Err(AuthError::TokenAcquisition(e))
            }
        }
    }

    /// Start an interactive redirect for a token to the configured resource.
    pub fn acquire_token_redirect(&self) {
        info!("Redirecting for a token to {}", self.options.resource);
        self.context.acquire_token_redirect(&self.options.resource);
    }

    /// Whether a valid, unexpired token is cached for the client id.
    pub fn is_authenticated(&self) -> bool {
        self.context.cached_token(&self.options.client_id).is_some()
    }

    /// The cached user's profile.
    pub fn user_profile(&self) -> Option<UserProfile> {
        self.context.cached_user().map(|user| user.profile)
    }

    /// The cached user's profile, initializing the session on first use.
    ///
    /// Initialization runs at most once per session, even with concurrent
    /// callers; later calls reuse the first outcome.
    pub async fn user_profile_lazy(&self, navigation: &Navigation) -> Option<UserProfile> {
        let outcome = *self
            .initialized
            .get_or_init(|| self.initialize(navigation))
            .await;
        debug!(?outcome, "Session initialization outcome");

        self.user_profile()
    }

    /// The profile according to the configured [`ProfileMode`].
    pub async fn profile(&self, navigation: &Navigation) -> Option<UserProfile> {
        match self.options.profile_mode {
            ProfileMode::Cached => self.user_profile(),
            ProfileMode::Memoized => self.user_profile_lazy(navigation).await,
        }
    }

    pub fn sign_in(&self) {
        self.context.login();
    }

    pub fn sign_out(&self) {
        info!("Signing out");
        self.context.log_out();
    }
}
