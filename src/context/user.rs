//! Cached user and profile types.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::error::StorageError;

/// Profile claims carried by the cached id token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Audience; must match the application's client id.
    pub aud: Option<String>,
    pub iss: Option<String>,
    /// Object id of the user in the tenant.
    pub oid: Option<String>,
    pub sub: Option<String>,
    /// Tenant id.
    pub tid: Option<String>,
    /// User Principal Name (typically email-like format).
    pub upn: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub unique_name: Option<String>,
    pub exp: Option<i64>,
    pub nbf: Option<i64>,
    pub iat: Option<i64>,

    /// Any claims not listed above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl UserProfile {
    /// Get the best available display name.
    pub fn display_name_or_upn(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.upn.clone())
            .or_else(|| self.unique_name.clone())
            .unwrap_or_else(|| "Unknown User".to_string())
    }

    /// Get the best available email.
    pub fn email(&self) -> String {
        self.email
            .clone()
            .or_else(|| self.upn.clone())
            .unwrap_or_else(|| "No email".to_string())
    }

    fn audience_matches(&self, client_id: &str) -> bool {
        self.aud
            .as_deref()
            .is_some_and(|aud| aud.eq_ignore_ascii_case(client_id))
    }
}

/// The signed-in user as cached by the authentication context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedUser {
    /// UPN, else email, else empty.
    pub user_name: String,
    pub profile: UserProfile,
}

impl CachedUser {
    pub fn from_profile(profile: UserProfile) -> Self {
        let user_name = profile
            .upn
            .clone()
            .or_else(|| profile.email.clone())
            .unwrap_or_default();
        Self { user_name, profile }
    }

    /// Build the user from a raw id token issued to `client_id`.
    ///
    /// The signature is not checked. Returns `Ok(None)` when the token was
    /// issued for a different audience.
    pub fn from_id_token(id_token: &str, client_id: &str) -> Result<Option<Self>, StorageError> {
        let profile = decode_id_token(id_token)?;

        if !profile.audience_matches(client_id) {
            warn!("Cached id token has an invalid aud field, ignoring it");
            return Ok(None);
        }

        Ok(Some(Self::from_profile(profile)))
    }
}

/// Decode the claims segment of a JWT.
pub fn decode_id_token(id_token: &str) -> Result<UserProfile, StorageError> {
    let mut segments = id_token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(StorageError::MalformedIdToken(
                "expected three segments".to_string(),
            ))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| StorageError::MalformedIdToken(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| StorageError::MalformedIdToken(e.to_string()))
}

#[cfg(test)]
pub(crate) fn make_id_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"typ":"JWT","alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_id_token() {
        let token = make_id_token(&json!({
            "aud": "Test-Client",
            "upn": "john@example.com",
            "name": "John Doe",
            "tid": "tenant",
            "exp": 1700000000,
            "amr": ["pwd"],
        }));

        let user = CachedUser::from_id_token(&token, "test-client")
            .unwrap()
            .expect("audience should match");
        assert_eq!(user.user_name, "john@example.com");
        assert_eq!(user.profile.display_name_or_upn(), "John Doe");
        assert_eq!(user.profile.exp, Some(1700000000));
        assert!(user.profile.extra.contains_key("amr"));
    }

    #[test]
    fn test_wrong_audience() {
        let token = make_id_token(&json!({ "aud": "someone-else", "upn": "x@y" }));
        assert!(CachedUser::from_id_token(&token, "test-client")
            .unwrap()
            .is_none());

        let token = make_id_token(&json!({ "upn": "x@y" }));
        assert!(CachedUser::from_id_token(&token, "test-client")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_user_name_fallback() {
        let profile = UserProfile {
            email: Some("user@tenant.com".into()),
            ..Default::default()
        };
        let user = CachedUser::from_profile(profile);
        assert_eq!(user.user_name, "user@tenant.com");
        assert_eq!(user.profile.email(), "user@tenant.com");
        assert_eq!(user.profile.display_name_or_upn(), "Unknown User");

        let user = CachedUser::from_profile(UserProfile::default());
        assert_eq!(user.user_name, "");
    }

    #[test]
    fn test_malformed_id_token() {
        assert!(matches!(
            decode_id_token("not-a-jwt"),
            Err(StorageError::MalformedIdToken(_))
        ));
        assert!(matches!(
            decode_id_token("a.!!!.c"),
            Err(StorageError::MalformedIdToken(_))
        ));
    }
}
