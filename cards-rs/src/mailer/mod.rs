//! Outgoing mail
//!
//! - [`SmtpMailer`]: pooled SMTP delivery through lettre
//! - [`LogMailer`]: writes the e-mail to the log instead of sending it
//!
//! A call makes exactly one delivery attempt; nothing is retried.

mod log;
mod smtp;

pub use self::log::LogMailer;
pub use self::smtp::SmtpMailer;

use crate::error::Result;
use uuid::Uuid;

/// A composed e-mail ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    /// Display name for the From header; the configured name when absent
    pub from_name: Option<String>,
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one e-mail and return its message id
    async fn send(&self, email: &OutgoingEmail) -> Result<String>;

    /// Check that the mail server is reachable
    async fn verify(&self) -> Result<()>;

    /// `host:port` of the mail server, for diagnostics
    fn endpoint(&self) -> String;
}

/// Generate a `Message-ID` value in the sender's domain
pub fn new_message_id(from_email: &str) -> String {
    let domain = from_email
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
        .unwrap_or("localhost");
    format!("<{}@{}>", Uuid::new_v4(), domain)
}
