//! Mailer that only logs, for running without an SMTP server

use super::{new_message_id, Mailer, OutgoingEmail};
use crate::error::Result;
use tracing::info;

pub struct LogMailer {
    from_email: String,
    /// Configured SMTP `host:port`, reported even though nothing connects to it
    endpoint: String,
}

impl LogMailer {
    pub fn new(from_email: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            from_email: from_email.into(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String> {
        let message_id = new_message_id(&self.from_email);
        info!(
            message_id = %message_id,
            to = %email.to,
            subject = %email.subject,
            from_name = email.from_name.as_deref().unwrap_or("-"),
            "SMTP disabled, e-mail not sent:\n{}",
            email.text
        );
        Ok(message_id)
    }

    async fn verify(&self) -> Result<()> {
        Ok(())
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_returns_message_id() {
        let mailer = LogMailer::new("cards@example.com", "localhost:1026");
        let email = OutgoingEmail {
            to: "alex@example.com".to_string(),
            subject: "Thank You from Sam".to_string(),
            html: "<p>Thanks!</p>".to_string(),
            text: "Thanks!".to_string(),
            from_name: Some("Sam".to_string()),
        };

        let id = mailer.send(&email).await.unwrap();
        assert!(id.ends_with("@example.com>"));
        assert!(mailer.verify().await.is_ok());
        assert_eq!(mailer.endpoint(), "localhost:1026");
    }
}
