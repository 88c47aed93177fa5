//! Read-only view of the browser storage the authentication library writes.
//!
//! A snapshot is the JSON export of a browser profile's `localStorage` and
//! `sessionStorage` for the application origin.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::StorageError;

/// Storage keys used by the authentication library.
pub const KEY_ID_TOKEN: &str = "adal.idtoken";
pub const KEY_ACCESS_TOKEN_PREFIX: &str = "adal.access.token.key";
pub const KEY_EXPIRATION_PREFIX: &str = "adal.expiration.key";
pub const KEY_LOGIN_REQUEST: &str = "adal.login.request";
pub const KEY_ERROR: &str = "adal.error";
pub const KEY_ERROR_DESCRIPTION: &str = "adal.error.description";

/// Which browser store holds the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheLocation {
    #[default]
    LocalStorage,
    SessionStorage,
}

/// Exported contents of both browser stores.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSnapshot {
    #[serde(default, rename = "localStorage")]
    local: HashMap<String, String>,
    #[serde(default, rename = "sessionStorage")]
    session: HashMap<String, String>,
}

impl StorageSnapshot {
    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        debug!("Loading storage snapshot from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Look up `key` in the store for `location`. Empty values read as absent.
    pub fn get(&self, location: CacheLocation, key: &str) -> Option<&str> {
        let store = match location {
            CacheLocation::LocalStorage => &self.local,
            CacheLocation::SessionStorage => &self.session,
        };
        store.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, location: CacheLocation, key: &str, value: &str) {
        let store = match location {
            CacheLocation::LocalStorage => &mut self.local,
            CacheLocation::SessionStorage => &mut self.session,
        };
        store.insert(key.to_string(), value.to_string());
    }
}

/// Key holding the access token for `resource`.
pub fn access_token_key(resource: &str) -> String {
    format!("{KEY_ACCESS_TOKEN_PREFIX}{resource}")
}

/// Key holding the expiry (Unix seconds) of the token for `resource`.
pub fn expiration_key(resource: &str) -> String {
    format!("{KEY_EXPIRATION_PREFIX}{resource}")
}
