//! Error types for the feed pipeline.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Invalid query options. Raised before any subscription is opened.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid reference '{value}': {reason}")]
    InvalidReference { value: String, reason: String },
}

/// Failures opening a subscription on the relay pool.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no relays to read from")]
    NoRelays,

    #[error("failed to add relay {url}")]
    AddRelay {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to subscribe")]
    Subscribe(#[source] BoxError),
}

/// Metadata content that could not be decoded into a profile.
#[derive(Debug, Error)]
#[error("malformed metadata from {author}: {source}")]
pub struct ProfileError {
    pub author: String,
    #[source]
    pub source: serde_json::Error,
}

/// Top-level error returned by a pipeline run.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("output failed")]
    Render(#[source] anyhow::Error),
}
