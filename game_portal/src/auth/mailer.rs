//! Outbound email seam.
//!
//! Delivery is best-effort: a failed send is logged by the caller and
//! never rolls back the state change that triggered it.

use async_trait::async_trait;
use thiserror::Error;

/// Mail delivery error
#[derive(Debug, Error)]
#[error("Mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Sends account emails (verification codes, password reset links)
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Mailer that writes messages to the log instead of sending them.
/// Default in development and tests.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        log::info!("mail to={to} subject={subject:?} body={body:?}");
        Ok(())
    }
}
