//! SMTP delivery of run reports.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use vpu_updater::{EmailConfig, NotifyError, Notifier};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends reports as plaintext mail through a STARTTLS relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    /// Build a notifier from the `[email]` section. Does not connect.
    pub fn from_config(config: &EmailConfig) -> Result<Self, NotifyError> {
        let (user, password) = match (&config.user, &config.password) {
            (Some(user), Some(password)) => (user.clone(), password.clone()),
            _ => {
                return Err(NotifyError::Build(
                    "email user and password are required".to_string(),
                ))
            }
        };
        let from = parse_mailbox(&config.sender())?;
        let to = parse_mailbox(&config.recipient())?;

        let relay = config.relay();
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&relay)
            .map_err(|e| NotifyError::Build(format!("relay {}: {}", relay, e)))?
            .port(config.port)
            .credentials(Credentials::new(user, password))
            .timeout(Some(SEND_TIMEOUT))
            .build();

        debug!(relay = %relay, port = config.port, "SMTP notifier ready");
        Ok(Self { transport, from, to })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = compose(&self.from, &self.to, subject, body)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| transport_error(e.status().map(|code| code.to_string()), &e))?;
        info!(to = %self.to, subject, "Report mailed");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse()
        .map_err(|e| NotifyError::Build(format!("invalid address '{}': {}", address, e)))
}

fn compose(from: &Mailbox, to: &Mailbox, subject: &str, body: &str) -> Result<Message, NotifyError> {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| NotifyError::Build(e.to_string()))
}

fn transport_error(code: Option<String>, err: &dyn std::fmt::Display) -> NotifyError {
    match code.as_deref().and_then(hint) {
        Some(hint) => NotifyError::Transport(format!("{} ({})", err, hint)),
        None => NotifyError::Transport(err.to_string()),
    }
}

/// Advice for the SMTP reply codes mail providers commonly send on login.
fn hint(code: &str) -> Option<&'static str> {
    match code {
        "534" => Some("the provider requires an app-specific password"),
        "535" => Some("the relay rejected the username or password"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            user: Some("ops".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_compose_plaintext_message() {
        let from: Mailbox = "ops@gmail.com".parse().unwrap();
        let to: Mailbox = "admin@example.org".parse().unwrap();
        let message = compose(&from, &to, "ExpressVPN Update Available", "Host: gateway").unwrap();

        let text = String::from_utf8(message.formatted()).unwrap();
        assert!(text.contains("Subject: ExpressVPN Update Available"));
        assert!(text.contains("From: ops@gmail.com"));
        assert!(text.contains("To: admin@example.org"));
        assert!(text.contains("Content-Type: text/plain"));
        assert!(text.contains("Host: gateway"));
    }

    #[test]
    fn test_missing_credentials() {
        let mut config = email_config();
        config.password = None;
        assert!(matches!(
            SmtpNotifier::from_config(&config),
            Err(NotifyError::Build(_))
        ));
    }

    #[test]
    fn test_invalid_recipient() {
        let mut config = email_config();
        config.to = Some("not an address".to_string());
        match SmtpNotifier::from_config(&config) {
            Err(NotifyError::Build(msg)) => assert!(msg.contains("not an address")),
            _ => panic!("expected a build error"),
        }
    }

    #[test]
    fn test_login_failures_carry_hint() {
        let err = transport_error(Some("535".to_string()), &"permanent error (535): bad login");
        assert!(err.to_string().contains("username or password"));

        let err = transport_error(Some("534".to_string()), &"permanent error (534)");
        assert!(err.to_string().contains("app-specific password"));

        let err = transport_error(None, &"connection refused");
        assert_eq!(
            err.to_string(),
            "could not deliver notification: connection refused"
        );
    }
}
