//! The release candidate for one run.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::cache::CacheResolver;
use crate::error::UpdateError;
use crate::locator::ReleaseEntry;
use crate::platform::PlatformLabel;
use crate::verify::VerificationOutcome;

/// Everything one run knows about the release it is handling.
///
/// Built once from the located entry. Only `already_cached` and the
/// verification outcome change afterwards, and each of them at most once.
#[derive(Debug, Clone)]
pub struct ReleaseCandidate {
    platform: PlatformLabel,
    installer_uri: Option<String>,
    signature_uri: Option<String>,
    installer_local_path: Option<PathBuf>,
    signature_local_path: Option<PathBuf>,
    already_cached: Option<bool>,
    verification: Option<VerificationOutcome>,
}

impl ReleaseCandidate {
    /// Derive local paths for the entry's URIs.
    pub fn new(
        platform: PlatformLabel,
        entry: ReleaseEntry,
        resolver: &CacheResolver,
    ) -> Result<Self, UpdateError> {
        let installer_local_path = entry
            .installer_uri
            .as_deref()
            .map(|uri| resolver.resolve(uri).map(|cached| cached.path))
            .transpose()?;

        // A signature that cannot be stored counts as no signature.
        let (signature_uri, signature_local_path) = match entry.signature_uri {
            Some(uri) => match resolver.resolve(&uri) {
                Ok(cached) => (Some(uri), Some(cached.path)),
                Err(e) => {
                    warn!(%platform, "Ignoring signature: {}", e);
                    (None, None)
                }
            },
            None => (None, None),
        };

        Ok(Self {
            platform,
            installer_local_path,
            signature_local_path,
            installer_uri: entry.installer_uri,
            signature_uri,
            already_cached: None,
            verification: None,
        })
    }

    pub fn platform(&self) -> PlatformLabel {
        self.platform
    }

    pub fn installer_uri(&self) -> Option<&str> {
        self.installer_uri.as_deref()
    }

    pub fn signature_uri(&self) -> Option<&str> {
        self.signature_uri.as_deref()
    }

    pub fn installer_local_path(&self) -> Option<&Path> {
        self.installer_local_path.as_deref()
    }

    pub fn signature_local_path(&self) -> Option<&Path> {
        self.signature_local_path.as_deref()
    }

    /// Whether the installer was on disk when the run checked. `None`
    /// before the check.
    pub fn already_cached(&self) -> Option<bool> {
        self.already_cached
    }

    pub fn verification_outcome(&self) -> &VerificationOutcome {
        self.verification
            .as_ref()
            .unwrap_or(&VerificationOutcome::NotAttempted)
    }

    /// Record the cache check result.
    pub fn mark_cached(&mut self, cached: bool) -> Result<(), UpdateError> {
        if self.already_cached.is_some() {
            return Err(UpdateError::Candidate("already_cached"));
        }
        self.already_cached = Some(cached);
        Ok(())
    }

    /// Record the verification result.
    pub fn record_verification(&mut self, outcome: VerificationOutcome) -> Result<(), UpdateError> {
        if self.verification.is_some() {
            return Err(UpdateError::Candidate("verification_outcome"));
        }
        self.verification = Some(outcome);
        Ok(())
    }

    /// Verification runs only with the installer on disk and a signature
    /// path to check.
    pub fn can_verify(&self) -> bool {
        let installer_present = self.installer_local_path().is_some_and(Path::is_file);
        let signature_present = self.signature_local_path().is_some_and(Path::is_file);
        installer_present && signature_present
    }
}
