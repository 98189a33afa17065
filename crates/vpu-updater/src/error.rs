//! Error types for the update pipeline.
//!
//! Only failures that stop a step are errors. A page without an entry for
//! the configured platform and a signature the trust tool rejects are both
//! ordinary values (see [`crate::locator::ReleaseEntry`] and
//! [`crate::verify::VerificationOutcome`]).

use std::path::PathBuf;

use thiserror::Error;

/// Failure to retrieve the vendor page, an installer, or a signature.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure, including connect and read timeouts
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// The vendor page was not text
    #[error("response from {url} is not text (content type {content_type})")]
    NotText { url: String, content_type: String },

    /// Writing the downloaded body failed
    #[error("could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// True when the underlying transport gave up because a timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Http { source, .. } if source.is_timeout())
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("could not read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be written
    #[error("could not write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::config::UpdaterConfig`]
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be serialized
    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is present but unusable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by the notifier collaborator.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The message could not be composed (bad address, missing field)
    #[error("could not build notification: {0}")]
    Build(String),

    /// The transport refused or failed to deliver the message
    #[error("could not deliver notification: {0}")]
    Transport(String),
}

/// Errors that can occur while driving the update pipeline.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Page or artifact retrieval failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A URI has no usable final path segment
    #[error("cannot derive a local filename from {0}")]
    InvalidUri(String),

    /// A set-once field of a release candidate was written twice
    #[error("release candidate field `{0}` is already set")]
    Candidate(&'static str),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
