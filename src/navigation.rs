//! Page navigation state supplied by the caller.
//!
//! The session never reads the current URL or window hierarchy on its own;
//! whoever hosts it describes the page load with a [`Navigation`].

use std::collections::HashMap;
use url::Url;

/// Fragment parameters whose presence marks a redirect back from the identity provider.
const CALLBACK_PARAMS: [&str; 3] = ["error_description", "access_token", "id_token"];

/// Where the page sits in the window hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameEmbedding {
    /// The page is the top-level window.
    #[default]
    TopLevel,
    /// The page is loaded inside a frame, e.g. a hidden token-renewal iframe.
    Embedded,
}

/// A single page load as seen by the session.
#[derive(Debug, Clone)]
pub struct Navigation {
    url: Url,
    embedding: FrameEmbedding,
}

impl Navigation {
    pub fn new(url: Url, embedding: FrameEmbedding) -> Self {
        Self { url, embedding }
    }

    /// A top-level page load.
    pub fn top_level(url: Url) -> Self {
        Self::new(url, FrameEmbedding::TopLevel)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The raw fragment including its leading `#`, or an empty string.
    pub fn hash(&self) -> String {
        self.url
            .fragment()
            .map(|f| format!("#{f}"))
            .unwrap_or_default()
    }

    pub fn embedding(&self) -> FrameEmbedding {
        self.embedding
    }

    pub fn is_embedded(&self) -> bool {
        self.embedding == FrameEmbedding::Embedded
    }
}

/// Decode a URL fragment into its parameters.
///
/// Accepts `#a=b`, `#/a=b` or `a=b`. Segments without `=` or with an empty key
/// are skipped; `a=` maps `a` to an empty string.
pub fn fragment_params(hash: &str) -> HashMap<String, String> {
    let trimmed = hash
        .strip_prefix("#/")
        .or_else(|| hash.strip_prefix('#'))
        .unwrap_or(hash);

    trimmed
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            let key = decode_component(key)?;
            let value = decode_component(value)?;
            Some((key, value))
        })
        .collect()
}

/// True when the fragment carries an identity-provider response.
pub fn is_callback_fragment(hash: &str) -> bool {
    let params = fragment_params(hash);
    CALLBACK_PARAMS.iter().any(|key| params.contains_key(*key))
}

fn decode_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}
