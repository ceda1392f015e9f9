//! SMTP mailer using lettre
//!
//! Connections are pooled (`max_connections`). lettre has no per-connection
//! message cap, so the whole pool is recycled after
//! `max_connections * max_messages` deliveries; no connection can serve more
//! than that many messages before it is replaced.

use super::{new_message_id, Mailer, OutgoingEmail};
use crate::config::{Environment, SmtpConfig};
use crate::error::{CardError, Result};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::PoolConfig;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

type Transport = AsyncSmtpTransport<Tokio1Executor>;

struct Pool {
    transport: Arc<Transport>,
    /// Deliveries handed to the current transport
    delivered: u64,
}

pub struct SmtpMailer {
    config: SmtpConfig,
    verify_tls: bool,
    from_address: Address,
    pool: Mutex<Pool>,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig, environment: Environment) -> Result<Self> {
        let verify_tls = config.verify_tls(environment);
        let from_address: Address = config.from_email.parse().map_err(|e| {
            CardError::Config(format!("Invalid from_email '{}': {}", config.from_email, e))
        })?;
        let transport = Arc::new(build_transport(&config, verify_tls)?);

        info!(
            "SMTP mailer configured for {} (secure: {}, verify TLS: {}, pool: {} x {})",
            config.endpoint(),
            config.is_secure(),
            verify_tls,
            config.max_connections,
            config.max_messages
        );

        Ok(Self {
            config,
            verify_tls,
            from_address,
            pool: Mutex::new(Pool {
                transport,
                delivered: 0,
            }),
        })
    }

    fn pool_capacity(&self) -> u64 {
        u64::from(self.config.max_connections.max(1)) * u64::from(self.config.max_messages.max(1))
    }

    /// Take the current transport for one delivery, recycling it when spent
    async fn checkout(&self) -> Result<Arc<Transport>> {
        let mut pool = self.pool.lock().await;
        if pool.delivered >= self.pool_capacity() {
            debug!("Recycling SMTP connection pool after {} messages", pool.delivered);
            pool.transport = Arc::new(build_transport(&self.config, self.verify_tls)?);
            pool.delivered = 0;
        }
        pool.delivered += 1;
        Ok(Arc::clone(&pool.transport))
    }

    fn build_message(&self, email: &OutgoingEmail, message_id: &str) -> Result<Message> {
        let from_name = email
            .from_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.config.from_name);
        let from = Mailbox::new(Some(from_name.to_string()), self.from_address.clone());

        let to: Mailbox = email.to.parse().map_err(|e| {
            CardError::invalid("to", &format!("Invalid recipient address: {}", e))
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.as_str())
            .message_id(Some(message_id.to_string()))
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| CardError::Internal(format!("Failed to build email: {}", e)))
    }
}

fn build_transport(config: &SmtpConfig, verify_tls: bool) -> Result<Transport> {
    let tls = if config.is_secure() || config.starttls {
        let parameters = TlsParameters::builder(config.host.clone())
            .dangerous_accept_invalid_certs(!verify_tls)
            .build_rustls()
            .map_err(|e| CardError::Config(format!("Invalid TLS parameters: {}", e)))?;
        if config.is_secure() {
            Tls::Wrapper(parameters)
        } else {
            Tls::Opportunistic(parameters)
        }
    } else {
        Tls::None
    };

    let mut builder = Transport::builder_dangerous(config.host.as_str())
        .port(config.port)
        .tls(tls)
        .timeout(Some(config.socket_timeout()))
        .pool_config(PoolConfig::new().max_size(config.max_connections.max(1)));

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    Ok(builder.build())
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String> {
        let message_id = new_message_id(&self.config.from_email);
        let message = self.build_message(email, &message_id)?;
        let transport = self.checkout().await?;

        debug!("Sending {} to {} via {}", message_id, email.to, self.endpoint());

        match tokio::time::timeout(self.config.connection_timeout(), transport.send(message)).await
        {
            Ok(Ok(_)) => {
                info!("Mail {} sent to {}", message_id, email.to);
                Ok(message_id)
            }
            Ok(Err(e)) => {
                error!("Failed to send mail to {}: {}", email.to, e);
                Err(CardError::Transport(e.to_string()))
            }
            Err(_) => {
                error!("Timed out sending mail to {}", email.to);
                Err(CardError::Transport(format!(
                    "SMTP delivery timed out after {}s",
                    self.config.connection_timeout_secs
                )))
            }
        }
    }

    async fn verify(&self) -> Result<()> {
        let transport = Arc::clone(&self.pool.lock().await.transport);

        match tokio::time::timeout(self.config.greeting_timeout(), transport.test_connection())
            .await
        {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(CardError::Transport(format!(
                "SMTP server at {} did not accept the connection",
                self.endpoint()
            ))),
            Ok(Err(e)) => Err(CardError::Transport(e.to_string())),
            Err(_) => Err(CardError::Transport(format!(
                "No SMTP greeting from {} within {}s",
                self.endpoint(),
                self.config.greeting_timeout_secs
            ))),
        }
    }

    fn endpoint(&self) -> String {
        self.config.endpoint()
    }
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn mailer(max_connections: u32, max_messages: u32) -> SmtpMailer {
        let mut config = Config::default().smtp;
        config.max_connections = max_connections;
        config.max_messages = max_messages;
        config.starttls = false;
        SmtpMailer::new(config, Environment::Development).unwrap()
    }

    #[tokio::test]
    async fn test_pool_is_recycled_after_capacity() {
        let mailer = mailer(1, 2);

        let first = mailer.checkout().await.unwrap();
        let second = mailer.checkout().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let third = mailer.checkout().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(mailer.pool.lock().await.delivered, 1);
    }

    #[tokio::test]
    async fn test_build_message_uses_sender_display_name() {
        let mailer = mailer(5, 100);
        let email = OutgoingEmail {
            to: "alex@example.com".to_string(),
            subject: "Thank You from Sam".to_string(),
            html: "<p>Thanks!</p>".to_string(),
            text: "Thanks!".to_string(),
            from_name: Some("Sam".to_string()),
        };

        let message = mailer.build_message(&email, "<id@thankyoucards.local>").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("From: Sam <noreply@thankyoucards.local>"));
        assert!(raw.contains("To: alex@example.com"));
        assert!(raw.contains("Subject: Thank You from Sam"));
        assert!(raw.contains("Message-ID: <id@thankyoucards.local>"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_a_validation_error() {
        let mailer = mailer(5, 100);
        let email = OutgoingEmail {
            to: "not an address".to_string(),
            subject: "Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
            text: "Hi".to_string(),
            from_name: None,
        };

        let result = mailer.build_message(&email, "<id@x>");
        assert!(matches!(result, Err(CardError::Validation(_))));
    }
}
