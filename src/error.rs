//! Error types for the aad-session crate.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error reported by the authentication context, as `(error, description)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextError {
    pub code: String,
    pub description: Option<String>,
}

impl ContextError {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// True when the context needs an interactive sign-in before it can issue tokens.
    pub fn is_login_required(&self) -> bool {
        self.code == "login_required" || self.code == "interaction_required"
    }
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.code, description),
            None => f.write_str(&self.code),
        }
    }
}

impl std::error::Error for ContextError {}

/// Token acquisition errors surfaced by the session.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token acquisition failed: {0}")]
    TokenAcquisition(#[from] ContextError),

    #[error("Authentication context returned no token")]
    NoToken,
}

/// Browser-storage snapshot errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read snapshot: {0}")]
    ReadFailed(#[from] std::io::Error),

    #[error("Failed to parse snapshot: {0}")]
    ParseFailed(#[from] serde_json::Error),

    #[error("Malformed id token: {0}")]
    MalformedIdToken(String),
}

/// Errors raised when handing a URL to the browser.
#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Failed to build navigation URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to open browser: {0}")]
    OpenFailed(String),
}

impl AppError {
    /// Returns a user-friendly message for display.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Auth(AuthError::TokenAcquisition(e)) if e.is_login_required() => {
                "Session expired. Please sign in again."
            }
            Self::Auth(AuthError::TokenAcquisition(_)) => "Could not get an access token.",
            Self::Auth(AuthError::NoToken) => "No access token available. Please sign in again.",
            Self::Storage(StorageError::MalformedIdToken(_)) => {
                "Cached sign-in is corrupt. Please sign in again."
            }
            Self::Storage(_) => "Failed to read the session cache.",
            Self::Navigation(NavigationError::OpenFailed(_)) => "Failed to open browser.",
            Self::Config(_) => "Configuration error. Please check settings.",
            _ => "An error occurred. Please try again.",
        }
    }

    /// Returns true if this error should send the user back through sign-in.
    pub fn requires_sign_in(&self) -> bool {
        match self {
            Self::Auth(AuthError::NoToken) => true,
            Self::Auth(AuthError::TokenAcquisition(e)) => e.is_login_required(),
            Self::Storage(StorageError::MalformedIdToken(_)) => true,
            _ => false,
        }
    }
}
