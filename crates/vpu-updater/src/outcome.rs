//! Terminal outcomes of a run and the reports they produce.

use std::path::PathBuf;

use crate::notify::Report;
use crate::platform::PlatformLabel;
use crate::verify::VerificationOutcome;

/// Step of the pipeline a run was aborted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Locate,
    ResolveCache,
    FetchInstaller,
    FetchSignature,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Locate => "locating the release",
            Self::ResolveCache => "resolving the local path",
            Self::FetchInstaller => "fetching the installer",
            Self::FetchSignature => "fetching the signature",
        };
        f.write_str(text)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The page has no entry for the platform
    NoMatch {
        platform: PlatformLabel,
        page_url: String,
    },
    /// The installer was downloaded by an earlier run
    AlreadyCurrent { installer_path: PathBuf },
    /// A new installer was downloaded
    NewRelease {
        platform: PlatformLabel,
        installer_path: PathBuf,
        /// Hex SHA-256 of the installer
        sha256: String,
        verification: VerificationOutcome,
    },
    /// A fetch failed and the run stopped
    Aborted { stage: Stage, error: String },
}

impl RunOutcome {
    /// Whether the run ended because something failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Report to deliver for this outcome.
    ///
    /// `AlreadyCurrent` has nothing to report.
    pub fn report(&self, product: &str, host: &str) -> Option<Report> {
        let failed_subject = || format!("{} Update FAILED", product);
        match self {
            Self::AlreadyCurrent { .. } => None,
            Self::NoMatch { platform, page_url } => Some(Report {
                subject: failed_subject(),
                body: format!(
                    "Host: {}\nCould not locate target URL for OS ({}) on page...\n{}",
                    host, platform, page_url
                ),
            }),
            Self::Aborted { stage, error } => Some(Report {
                subject: failed_subject(),
                body: format!("Host: {}\nUpdate check aborted while {}: {}", host, stage, error),
            }),
            Self::NewRelease {
                platform,
                installer_path,
                sha256,
                verification,
            } => {
                let mut body = format!(
                    "Host: {}\n$ {}\nSHA-256: {}",
                    host,
                    platform.install_hint(installer_path),
                    sha256
                );
                match verification {
                    VerificationOutcome::NotAttempted => {}
                    VerificationOutcome::Verified => body.push_str("\nSignature verified"),
                    VerificationOutcome::Failed { reason } => {
                        body.push_str("\nWARNING! Signature NOT verified!\n");
                        body.push_str(reason);
                    }
                }
                Some(Report {
                    subject: format!("{} Update Available", product),
                    body,
                })
            }
        }
    }

    /// Single line printed to the console at the end of a run.
    pub fn console_message(&self, product: &str, host: &str) -> String {
        match self.report(product, host) {
            Some(report) => format!("{} - {}", report.subject, report.body),
            None => match self {
                Self::AlreadyCurrent { installer_path } => format!(
                    "Latest update already downloaded: {}",
                    installer_path.display()
                ),
                _ => String::new(),
            },
        }
    }
}
