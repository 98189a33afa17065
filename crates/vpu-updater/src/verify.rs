//! Detached signature verification through an external trust tool.
//!
//! The cryptography lives in the tool (GnuPG by default). This module only
//! builds its argument lists and interprets what comes back: a zero exit
//! status together with empty standard output is a valid signature, every
//! other result is a failure that the report must flag.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Captured result of one trust tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// External program that imports keys and checks detached signatures.
#[async_trait]
pub trait TrustTool: Send + Sync {
    /// Run the tool with `args` and capture its output.
    ///
    /// Launch failures and timeouts are `Err`; a non-zero exit is `Ok`.
    async fn run(&self, args: &[OsString]) -> std::io::Result<ToolOutput>;
}

#[async_trait]
impl<T: TrustTool + ?Sized> TrustTool for std::sync::Arc<T> {
    async fn run(&self, args: &[OsString]) -> std::io::Result<ToolOutput> {
        (**self).run(args).await
    }
}

/// GnuPG, or a compatible program, invoked as a subprocess.
#[derive(Debug, Clone)]
pub struct GpgTool {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl GpgTool {
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for GpgTool {
    fn default() -> Self {
        Self::new("gpg", Some(Duration::from_secs(120)))
    }
}

#[async_trait]
impl TrustTool for GpgTool {
    async fn run(&self, args: &[OsString]) -> std::io::Result<ToolOutput> {
        debug!(program = %self.program.display(), ?args, "Running trust tool");
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, output).await.map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("{} did not finish within {:?}", self.program.display(), limit),
                )
            })??,
            None => output.await?,
        };

        Ok(ToolOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Result of checking a detached signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// No signature was available, so nothing was checked
    NotAttempted,
    /// Tool exited successfully with no output
    Verified,
    /// Tool rejected the signature or could not run
    Failed { reason: String },
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// Imports the publisher key and verifies detached signatures.
pub struct SignatureVerifier {
    tool: Box<dyn TrustTool>,
}

impl SignatureVerifier {
    pub fn new(tool: Box<dyn TrustTool>) -> Self {
        Self { tool }
    }

    /// Fetch the publisher key from a key server.
    ///
    /// Best effort: the key may already be in the keyring from an earlier
    /// run, so failures are logged and otherwise ignored.
    pub async fn import_publisher_key(&self, keyserver: &str, key_id: &str) {
        let args = [
            OsString::from("--keyserver"),
            OsString::from(keyserver),
            OsString::from("--recv-keys"),
            OsString::from(key_id),
        ];
        match self.tool.run(&args).await {
            Ok(output) if output.success() => {
                debug!(key_id, keyserver, "Publisher key imported");
            }
            Ok(output) => {
                warn!(
                    key_id,
                    keyserver,
                    "Publisher key import failed ({}): {}",
                    describe_exit(output.exit_code),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(e) => {
                warn!(key_id, keyserver, "Could not run trust tool for key import: {}", e);
            }
        }
    }

    /// Check the detached signature at `signature_path`.
    pub async fn verify(&self, signature_path: &Path) -> VerificationOutcome {
        let args = [
            OsString::from("--verify"),
            signature_path.as_os_str().to_owned(),
        ];
        let outcome = match self.tool.run(&args).await {
            Ok(output) => interpret(&output),
            Err(e) => VerificationOutcome::Failed {
                reason: format!("trust tool could not run: {}", e),
            },
        };

        match &outcome {
            VerificationOutcome::Verified => {
                info!(signature = %signature_path.display(), "Signature verified")
            }
            VerificationOutcome::Failed { reason } => {
                warn!(signature = %signature_path.display(), "Signature NOT verified: {}", reason)
            }
            VerificationOutcome::NotAttempted => {}
        }
        outcome
    }
}

/// Map a `--verify` invocation result to an outcome.
///
/// Requires both a zero exit status and empty standard output.
pub fn interpret(output: &ToolOutput) -> VerificationOutcome {
    if output.success() && output.stdout.is_empty() {
        return VerificationOutcome::Verified;
    }

    let mut reason = describe_exit(output.exit_code);
    for stream in [&output.stdout, &output.stderr] {
        let text = String::from_utf8_lossy(stream);
        let text = text.trim();
        if !text.is_empty() {
            reason.push('\n');
            reason.push_str(text);
        }
    }
    VerificationOutcome::Failed { reason }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}
