//! Update pipeline - sequences one run.
//!
//! Locate the release, check the cache, fetch the signature and then the
//! installer when the installer is new, verify the signature when there is
//! one, and report. Every step runs after the previous one finished; there
//! are no retries and no way back.
//!
//! ```text
//! Located -> CacheChecked -> Fetched -------> Verified | VerificationFailed -> Reported
//!                        \                \-> VerificationSkipped ----------/
//!                         \-> SkippedCached ----------------------------------/
//! ```

use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::cache::CacheResolver;
use crate::candidate::ReleaseCandidate;
use crate::config::UpdaterConfig;
use crate::download::{Downloader, DownloaderConfig};
use crate::error::UpdateError;
use crate::locator::ReleaseLocator;
use crate::notify::Notifier;
use crate::outcome::{RunOutcome, Stage};
use crate::verify::{SignatureVerifier, TrustTool, VerificationOutcome};

/// Host name used in reports when none is supplied.
const UNKNOWN_HOST: &str = "unknown-host";

/// Progress of a run through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Located,
    CacheChecked,
    Fetched,
    SkippedCached,
    Verified,
    VerificationSkipped,
    VerificationFailed,
    Reported,
}

/// Drives one update check from the vendor page to the report.
///
/// # Example
///
/// ```ignore
/// use vpu_updater::{ConsoleNotifier, GpgTool, UpdatePipeline, UpdaterConfig};
///
/// let config = UpdaterConfig::default();
/// let pipeline = UpdatePipeline::new(
///     config,
///     Box::new(GpgTool::default()),
///     Box::new(ConsoleNotifier),
/// )?
/// .with_host("gateway");
///
/// let outcome = pipeline.run().await;
/// println!("{}", pipeline.console_message(&outcome));
/// ```
pub struct UpdatePipeline {
    config: UpdaterConfig,
    downloader: Downloader,
    resolver: CacheResolver,
    verifier: SignatureVerifier,
    notifier: Box<dyn Notifier>,
    host: String,
}

impl UpdatePipeline {
    /// Create a pipeline from configuration and its two collaborators.
    pub fn new(
        config: UpdaterConfig,
        trust_tool: Box<dyn TrustTool>,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self, UpdateError> {
        let downloader = Downloader::with_config(DownloaderConfig::from(&config.network))?;
        let resolver = CacheResolver::new(config.cache_dir.clone(), config.fallback_dir());

        Ok(Self {
            config,
            downloader,
            resolver,
            verifier: SignatureVerifier::new(trust_tool),
            notifier,
            host: UNKNOWN_HOST.to_string(),
        })
    }

    /// Host name written into reports.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Line to print on the console for `outcome`.
    pub fn console_message(&self, outcome: &RunOutcome) -> String {
        outcome.console_message(&self.config.product_name, &self.host)
    }

    /// Run the pipeline once and hand the report to the notifier.
    ///
    /// Never fails: every error ends up in the returned outcome and its
    /// report. A notifier failure is logged and otherwise ignored.
    pub async fn run(&self) -> RunOutcome {
        let outcome = self.execute().await;

        match outcome.report(&self.config.product_name, &self.host) {
            Some(report) => {
                if let Err(e) = self.notifier.send(&report.subject, &report.body).await {
                    warn!("Could not deliver report '{}': {}", report.subject, e);
                }
            }
            None => info!("{}", self.console_message(&outcome)),
        }

        self.enter(PipelineState::Reported);
        outcome
    }

    /// Run every step up to, but not including, the report.
    pub async fn execute(&self) -> RunOutcome {
        let platform = self.config.platform;
        let page_url = self.config.page_url.as_str();
        info!(%platform, page_url, "Checking for updates...");

        let entry = match ReleaseLocator::new(&self.downloader)
            .locate(page_url, platform)
            .await
        {
            Ok(entry) => entry,
            Err(e) => return abort(Stage::Locate, e),
        };
        self.enter(PipelineState::Located);

        let mut candidate = match ReleaseCandidate::new(platform, entry, &self.resolver) {
            Ok(candidate) => candidate,
            Err(e) => return abort(Stage::ResolveCache, e),
        };

        let (Some(installer_uri), Some(installer_path)) = (
            candidate.installer_uri().map(str::to_string),
            candidate.installer_local_path().map(Path::to_path_buf),
        ) else {
            warn!(%platform, "No installer listed for platform");
            return RunOutcome::NoMatch {
                platform,
                page_url: page_url.to_string(),
            };
        };

        let cached = installer_path.is_file();
        if let Err(e) = candidate.mark_cached(cached) {
            return abort(Stage::ResolveCache, e);
        }
        self.enter(PipelineState::CacheChecked);

        if cached {
            self.enter(PipelineState::SkippedCached);
            return RunOutcome::AlreadyCurrent { installer_path };
        }

        // The installer marks the release as done, so it is written last.
        if let (Some(uri), Some(path)) = (candidate.signature_uri(), candidate.signature_local_path()) {
            if path.is_file() {
                debug!(signature = %path.display(), "Reusing downloaded signature");
            } else if let Err(e) = self.downloader.download_to(uri, path).await {
                return abort(Stage::FetchSignature, e);
            }
        }

        let installer = match self.downloader.download_to(&installer_uri, &installer_path).await {
            Ok(installer) => installer,
            Err(e) => return abort(Stage::FetchInstaller, e),
        };
        self.enter(PipelineState::Fetched);

        let verification = self.verify(&candidate).await;
        if let Err(e) = candidate.record_verification(verification.clone()) {
            warn!("{}", e);
        }

        RunOutcome::NewRelease {
            platform,
            installer_path,
            sha256: installer.sha256,
            verification,
        }
    }

    async fn verify(&self, candidate: &ReleaseCandidate) -> VerificationOutcome {
        let signature = match candidate.signature_local_path() {
            Some(path) if candidate.can_verify() => path,
            _ => {
                self.enter(PipelineState::VerificationSkipped);
                return VerificationOutcome::NotAttempted;
            }
        };

        let trust = &self.config.trust;
        self.verifier
            .import_publisher_key(&trust.keyserver, &trust.key_id)
            .await;
        let outcome = self.verifier.verify(signature).await;

        self.enter(if outcome.is_verified() {
            PipelineState::Verified
        } else {
            PipelineState::VerificationFailed
        });
        outcome
    }

    fn enter(&self, state: PipelineState) {
        debug!(?state, "Pipeline state");
    }
}

fn abort(stage: Stage, err: impl Into<UpdateError>) -> RunOutcome {
    let err = err.into();
    error!("Update check aborted while {}: {}", stage, err);
    RunOutcome::Aborted {
        stage,
        error: err.to_string(),
    }
}
