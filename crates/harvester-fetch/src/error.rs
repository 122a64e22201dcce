//! Error types for fetch session setup.

use thiserror::Error;

/// Result type for fetch session setup.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Failures while setting up a fetch session.
///
/// Individual page fetches never fail with this type; they report through
/// [`crate::PageResult`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// A configured endpoint URL does not parse
    #[error("invalid {field} URL '{url}': {source}")]
    InvalidUrl {
        /// Which endpoint setting held the URL
        field: &'static str,
        /// The rejected value
        url: String,
        /// Parser error
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The session priming request never completed
    #[error("session bootstrap against {url} failed: {source}")]
    Bootstrap {
        /// Bootstrap page URL
        url: String,
        /// Transport error
        #[source]
        source: reqwest::Error,
    },

    /// The user agent pool is empty
    #[error("no user agents configured")]
    NoIdentities,
}
