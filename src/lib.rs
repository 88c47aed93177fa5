//! Azure AD session bootstrapping.
//!
//! Wraps an external authentication context behind a small session facade:
//! decide on page load whether to complete a redirect callback, restore a
//! cached user, or start sign-in; then hand out tokens and profiles.

#![deny(clippy::all)]

pub mod config;
pub mod context;
pub mod error;
pub mod navigation;
pub mod navigator;
pub mod session;
pub mod settings;
pub mod storage;

pub use context::{AuthenticationContext, CachedUser, SecureString, SnapshotContext, UserProfile};
pub use error::{AppError, AuthError, ContextError};
pub use navigation::{FrameEmbedding, Navigation};
pub use session::{AuthSession, Bootstrap, ProfileMode, SessionOptions};
