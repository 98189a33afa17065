//! Report delivery.
//!
//! The pipeline hands every report to a [`Notifier`]. Delivery failures are
//! the notifier's problem: the pipeline logs them and finishes the run.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::error::NotifyError;

/// Subject and plaintext body of a run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub body: String,
}

/// Delivers run reports to a human.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Writes reports to the log only.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        info!(subject, "Report: {}", body.replace('\n', " | "));
        Ok(())
    }
}

/// Keeps sent reports in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct StubNotifier {
    sent: Mutex<Vec<Report>>,
    fail: bool,
}

impl StubNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails after recording the report.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Reports handed over so far.
    pub fn sent(&self) -> Vec<Report> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for StubNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(Report {
                subject: subject.to_string(),
                body: body.to_string(),
            });
        }
        if self.fail {
            return Err(NotifyError::Transport("stub delivery failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        (**self).send(subject, body).await
    }
}
