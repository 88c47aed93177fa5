//! Configuration loading and management.
//!
//! Loads configuration from embedded config.toml with environment variable overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

use crate::session::{ProfileMode, SessionOptions};
use crate::storage::CacheLocation;

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

/// Largest accepted token expiry offset (one day).
const MAX_EXPIRE_OFFSET_SECONDS: i64 = 86_400;

/// Authority used when the config does not name one.
const DEFAULT_INSTANCE: &str = "https://login.microsoftonline.com/";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub adal: AdalConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
}

/// Settings handed to the authentication context.
#[derive(Debug, Clone, Deserialize)]
pub struct AdalConfig {
    #[serde(default = "default_instance")]
    pub instance: String,
    pub tenant: String,
    pub client_id: String,
    pub redirect_uri: String,
    /// Where to send the browser after logout. Falls back to `redirect_uri`.
    #[serde(default)]
    pub post_logout_redirect_uri: Option<String>,
    #[serde(default)]
    pub cache_location: CacheLocation,
    /// Resource the application requests access tokens for.
    pub resource_id: String,
    /// Tokens expiring within this many seconds are treated as expired.
    #[serde(default = "default_expire_offset")]
    pub expire_offset_seconds: i64,
}

/// Bootstrap behavior switches.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_true")]
    pub frame_detection: bool,
    #[serde(default)]
    pub profile_mode: ProfileMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_detection: true,
            profile_mode: ProfileMode::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_instance() -> String {
    DEFAULT_INSTANCE.to_string()
}

fn default_expire_offset() -> i64 {
    300
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from embedded config.toml with environment variable overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::parse(CONFIG_TOML)?;

        if let Ok(client_id) = env::var("AZURE_CLIENT_ID") {
            config.adal.client_id = client_id;
        }

        if let Ok(tenant) = env::var("AZURE_TENANT_ID") {
            config.adal.tenant = tenant;
        }

        if let Ok(redirect_uri) = env::var("AZURE_REDIRECT_URI") {
            config.adal.redirect_uri = redirect_uri;
        }

        if let Ok(resource_id) = env::var("AZURE_RESOURCE_ID") {
            config.adal.resource_id = resource_id;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            config.logging.level = log_level;
        }

        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document without applying overrides or validation.
    pub fn parse(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse config.toml")
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.adal.client_id.is_empty() || self.adal.client_id == "YOUR_AZURE_AD_CLIENT_ID" {
            anyhow::bail!(
                "Azure AD client_id not configured. Set AZURE_CLIENT_ID environment variable \
                 or update config.toml"
            );
        }

        if self.adal.tenant.is_empty() || self.adal.tenant == "YOUR_TENANT_ID" {
            anyhow::bail!(
                "Azure AD tenant not configured. Set AZURE_TENANT_ID environment variable \
                 or update config.toml"
            );
        }

        if self.adal.resource_id.is_empty() || self.adal.resource_id == "YOUR_RESOURCE_ID" {
            anyhow::bail!(
                "Target resource not configured. Set AZURE_RESOURCE_ID environment variable \
                 or update config.toml"
            );
        }

        if !(0..=MAX_EXPIRE_OFFSET_SECONDS).contains(&self.adal.expire_offset_seconds) {
            anyhow::bail!(
                "expire_offset_seconds must be between 0 and {}, got {}",
                MAX_EXPIRE_OFFSET_SECONDS,
                self.adal.expire_offset_seconds
            );
        }

        url::Url::parse(&self.adal.redirect_uri)
            .with_context(|| format!("Invalid redirect_uri: {}", self.adal.redirect_uri))?;

        Ok(())
    }

    /// Options for the session bootstrapper.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            client_id: self.adal.client_id.clone(),
            resource: self.adal.resource_id.clone(),
            frame_detection: self.session.frame_detection,
            profile_mode: self.session.profile_mode,
        }
    }

    /// Authority base for the configured tenant, always ending in `/`.
    pub fn authority(&self) -> String {
        let instance = self.adal.instance.trim_end_matches('/');
        format!("{}/{}/", instance, self.adal.tenant)
    }

    /// Get the authorization URL for Azure AD.
    pub fn auth_url(&self) -> String {
        format!("{}oauth2/authorize", self.authority())
    }

    /// Get the logout URL for Azure AD.
    pub fn logout_url(&self) -> String {
        format!("{}oauth2/logout", self.authority())
    }

    /// Where the browser lands after logout.
    pub fn post_logout_redirect_uri(&self) -> &str {
        self.adal
            .post_logout_redirect_uri
            .as_deref()
            .unwrap_or(&self.adal.redirect_uri)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        app: AppConfig {
            name: "test".into(),
            version: "0.1.0".into(),
        },
        adal: AdalConfig {
            instance: DEFAULT_INSTANCE.into(),
            tenant: "test-tenant".into(),
            client_id: "test-client".into(),
            redirect_uri: "http://localhost:8080/".into(),
            post_logout_redirect_uri: None,
            cache_location: CacheLocation::LocalStorage,
            resource_id: "https://api.example.com".into(),
            expire_offset_seconds: 300,
        },
        session: SessionConfig::default(),
        logging: LoggingConfig {
            level: "info".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parsing() {
        // Placeholder values fail validation, but parsing should work
        let result = Config::parse(CONFIG_TOML);
        assert!(result.is_ok(), "Config parsing failed: {:?}", result.err());

        let config = result.unwrap();
        assert!(config.session.frame_detection);
        assert_eq!(config.session.profile_mode, ProfileMode::Cached);
        assert_eq!(config.adal.cache_location, CacheLocation::LocalStorage);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_section_optional() {
        let source = r#"
            [app]
            name = "x"
            version = "0.1.0"

            [adal]
            tenant = "t"
            client_id = "c"
            redirect_uri = "http://localhost/"
            cache_location = "sessionStorage"
            resource_id = "r"

            [logging]
            level = "debug"
        "#;
        let config = Config::parse(source).unwrap();
        assert!(config.session.frame_detection);
        assert_eq!(config.adal.expire_offset_seconds, 300);
        assert_eq!(config.adal.instance, DEFAULT_INSTANCE);
        assert_eq!(config.adal.cache_location, CacheLocation::SessionStorage);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_memoized_profile_mode() {
        let source = CONFIG_TOML.replace(r#"profile_mode = "cached""#, r#"profile_mode = "memoized""#);
        let config = Config::parse(&source).unwrap();
        assert_eq!(config.session.profile_mode, ProfileMode::Memoized);
    }

    #[test]
    fn test_invalid_redirect_uri() {
        let mut config = test_config();
        config.adal.redirect_uri = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expire_offset_bounds() {
        let mut config = test_config();

        config.adal.expire_offset_seconds = 0;
        assert!(config.validate().is_ok());

        config.adal.expire_offset_seconds = MAX_EXPIRE_OFFSET_SECONDS;
        assert!(config.validate().is_ok());

        config.adal.expire_offset_seconds = -1;
        assert!(config.validate().is_err());

        config.adal.expire_offset_seconds = i64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("expire_offset_seconds"));
    }

    #[test]
    fn test_urls() {
        let config = test_config();

        assert_eq!(
            config.auth_url(),
            "https://login.microsoftonline.com/test-tenant/oauth2/authorize"
        );
        assert_eq!(
            config.logout_url(),
            "https://login.microsoftonline.com/test-tenant/oauth2/logout"
        );
        assert_eq!(config.post_logout_redirect_uri(), "http://localhost:8080/");
    }

    #[test]
    fn test_session_options() {
        let config = test_config();
        let options = config.session_options();
        assert_eq!(options.client_id, "test-client");
        assert_eq!(options.resource, "https://api.example.com");
        assert!(options.frame_detection);
    }
}
