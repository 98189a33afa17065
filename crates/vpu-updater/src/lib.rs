//! # vpu-updater
//!
//! Release discovery, idempotent fetch and signature verification for a
//! vendor-hosted package.
//!
//! One run of [`UpdatePipeline`]:
//! - fetches the vendor download page and picks the entry for the
//!   configured [`PlatformLabel`]
//! - maps the installer and signature URIs to files in the cache directory
//! - downloads what is not there yet, never leaving a truncated file behind
//! - checks the detached signature with an external [`TrustTool`] (GnuPG)
//! - hands a plaintext report to a [`Notifier`]
//!
//! ## Idempotence
//!
//! The downloaded installer is the only state kept between runs. A run that
//! finds it already on disk stops there and sends nothing.

pub mod cache;
pub mod candidate;
pub mod config;
pub mod download;
pub mod error;
pub mod locator;
pub mod notify;
pub mod outcome;
pub mod pipeline;
pub mod platform;
#[cfg(test)]
mod proptests;
pub mod verify;

// Re-export main types for convenience
pub use cache::{filename_from_uri, CacheResolver, CachedPath};
pub use candidate::ReleaseCandidate;
pub use config::{EmailConfig, NetworkConfig, TrustConfig, UpdaterConfig};
pub use download::{DownloadedFile, Downloader, DownloaderConfig};
pub use error::{ConfigError, FetchError, NotifyError, UpdateError};
pub use locator::{find_release_entry, ReleaseEntry, ReleaseLocator};
pub use notify::{ConsoleNotifier, Notifier, Report, StubNotifier};
pub use outcome::{RunOutcome, Stage};
pub use pipeline::{PipelineState, UpdatePipeline};
pub use platform::PlatformLabel;
pub use verify::{GpgTool, SignatureVerifier, ToolOutput, TrustTool, VerificationOutcome};
