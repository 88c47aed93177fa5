//! Interactive redirects to the identity provider.

use tracing::{error, info};
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::error::NavigationError;

/// Library metadata appended to authorize requests.
const CLIENT_SKU: &str = "Js";
const CLIENT_VERSION: &str = "1.0.17";

/// A page navigation the authentication flow asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationRequest {
    /// Interactive sign-in returning an id token.
    Login,
    /// Sign out at the identity provider.
    Logout,
    /// Interactive request for an access token to `resource`.
    TokenRedirect { resource: String },
    /// Go back to an application page after a callback.
    Return { url: String },
}

impl NavigationRequest {
    /// Build the target URL.
    ///
    /// Authorize requests get a fresh state, nonce and correlation id each time.
    pub fn to_url(&self, config: &Config) -> Result<Url, NavigationError> {
        match self {
            Self::Login => {
                let mut url = authorize_url(config, "id_token", None)?;
                url.query_pairs_mut()
                    .append_pair("nonce", &Uuid::new_v4().to_string());
                Ok(url)
            }
            Self::TokenRedirect { resource } => {
                let mut url = authorize_url(config, "token", Some(resource.as_str()))?;
                url.query_pairs_mut()
                    .append_pair("nonce", &Uuid::new_v4().to_string());
                Ok(url)
            }
            Self::Logout => {
                let mut url = Url::parse(&config.logout_url())?;
                url.query_pairs_mut()
                    .append_pair("post_logout_redirect_uri", config.post_logout_redirect_uri());
                Ok(url)
            }
            Self::Return { url } => Ok(Url::parse(url)?),
        }
    }
}

fn authorize_url(
    config: &Config,
    response_type: &str,
    resource: Option<&str>,
) -> Result<Url, NavigationError> {
    let mut url = Url::parse(&config.auth_url())?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("response_type", response_type)
            .append_pair("client_id", &config.adal.client_id);
        if let Some(resource) = resource {
            query.append_pair("resource", resource);
        }
        query
            .append_pair("redirect_uri", &config.adal.redirect_uri)
            .append_pair("state", &Uuid::new_v4().to_string())
            .append_pair("client-request-id", &Uuid::new_v4().to_string())
            .append_pair("x-client-SKU", CLIENT_SKU)
            .append_pair("x-client-Ver", CLIENT_VERSION);
    }

    Ok(url)
}

/// Something that can send the user to a URL.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &Url) -> Result<(), NavigationError>;
}

/// Opens targets in the system browser.
#[derive(Debug, Default)]
pub struct BrowserNavigator {
    dry_run: bool,
}

impl BrowserNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A navigator that only logs the targets.
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

impl Navigator for BrowserNavigator {
    fn navigate(&self, target: &Url) -> Result<(), NavigationError> {
        if self.dry_run {
            info!("Would navigate to {}", target);
            return Ok(());
        }

        info!("Opening browser at {}", target);
        open::that(target.as_str()).map_err(|e| {
            error!("Failed to open browser: {}", e);
            NavigationError::OpenFailed(e.to_string())
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every target instead of opening it.
    #[derive(Debug, Default)]
    pub struct RecordingNavigator {
        pub visited: Mutex<Vec<Url>>,
    }

    impl RecordingNavigator {
        pub fn visited(&self) -> Vec<Url> {
            self.visited.lock().unwrap().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, target: &Url) -> Result<(), NavigationError> {
            self.visited.lock().unwrap().push(target.clone());
            Ok(())
        }
    }
}
