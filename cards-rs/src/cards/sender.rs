//! Card dispatch pipeline
//!
//! `get -> not yet sent -> render -> mail -> mark_sent`. A failed delivery
//! leaves the card as a draft.

use crate::cards::renderer::{render, render_subject};
use crate::cards::store::CardStore;
use crate::cards::types::{Card, CardType};
use crate::cards::validator::ensure_valid_email_request;
use crate::error::{CardError, Result};
use crate::mailer::{Mailer, OutgoingEmail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Outcome of a successful card send
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub message_id: String,
    pub sent_at: DateTime<Utc>,
    #[serde(skip)]
    pub card: Card,
}

/// Ad-hoc e-mail built by the client, never stored as a card
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmailRequest {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub html: Option<String>,
    pub card_data: Option<EmailCardData>,
}

/// Card details attached to an ad-hoc e-mail, used for the text part
///
/// Clients send whole card objects here; fields other than these are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailCardData {
    pub card_type: Option<CardType>,
    pub sender_name: Option<String>,
    pub recipient_name: Option<String>,
    pub message: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl EmailCardData {
    /// Plain-text fallback for an ad-hoc e-mail
    pub fn text_fallback(&self) -> String {
        let card_type = self.card_type.clone().unwrap_or_default();
        let sender = non_blank(&self.sender_name).unwrap_or("Someone");
        let recipient = non_blank(&self.recipient_name).unwrap_or("Friend");
        let message = non_blank(&self.message).unwrap_or("Thank you!");
        let closing = crate::cards::renderer::card_type_info(&card_type).closing;
        let heading = match card_type {
            CardType::ThankYou => format!("Thank You Card from {}", sender),
            _ => render_subject(&card_type, sender),
        };

        format!(
            "{}\n\nDear {},\n\n{}\n\n{}\n{}",
            heading,
            recipient,
            message,
            closing,
            sender
        )
    }
}

/// Releases the in-flight claim on drop
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.id);
    }
}

pub struct CardSender {
    store: Arc<dyn CardStore>,
    mailer: Arc<dyn Mailer>,
    in_flight: Mutex<HashSet<String>>,
}

impl CardSender {
    pub fn new(store: Arc<dyn CardStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            mailer,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn claim(&self, id: &str) -> Result<InFlight<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(id.to_string()) {
            return Err(CardError::SendInProgress(id.to_string()));
        }
        Ok(InFlight {
            set: &self.in_flight,
            id: id.to_string(),
        })
    }

    /// Render and mail a stored card, then mark it sent
    pub async fn send(&self, id: &str) -> Result<SendReceipt> {
        let _claim = self.claim(id)?;

        let card = self.store.get(id).await?;
        if card.is_sent {
            return Err(CardError::AlreadySent(id.to_string()));
        }

        let rendered = render(&card);
        let email = OutgoingEmail {
            to: card.recipient_email.clone(),
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
            from_name: Some(card.sender_name.clone()),
        };

        let message_id = self.mailer.send(&email).await?;

        let card = self.store.mark_sent(id, &message_id).await.map_err(|e| {
            warn!("Card {} was mailed as {} but not marked sent: {}", id, message_id, e);
            e
        })?;
        let sent_at = card.sent_at.unwrap_or_else(Utc::now);

        info!("Card {} sent to {} ({})", id, card.recipient_email, message_id);
        Ok(SendReceipt {
            message_id,
            sent_at,
            card,
        })
    }

    /// Send an ad-hoc e-mail without touching the store
    pub async fn send_adhoc(&self, request: EmailRequest) -> Result<String> {
        ensure_valid_email_request(
            request.to.as_deref(),
            request.subject.as_deref(),
            request.html.as_deref(),
        )?;

        let card_data = request.card_data.unwrap_or_default();
        let email = OutgoingEmail {
            to: request.to.unwrap_or_default().trim().to_string(),
            subject: request.subject.unwrap_or_default(),
            html: request.html.unwrap_or_default(),
            text: card_data.text_fallback(),
            from_name: non_blank(&card_data.sender_name).map(str::to_string),
        };

        let message_id = self.mailer.send(&email).await?;
        info!("Ad-hoc e-mail sent to {} ({})", email.to, message_id);
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::store::MemoryCardStore;
    use crate::cards::types::CardInput;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Mailer that holds every delivery open for a while
    #[derive(Default)]
    struct SlowMailer {
        deliveries: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Mailer for SlowMailer {
        async fn send(&self, _email: &OutgoingEmail) -> Result<String> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let n = self.deliveries.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("<{}@test.local>", n))
        }

        async fn verify(&self) -> Result<()> {
            Ok(())
        }

        fn endpoint(&self) -> String {
            "smtp.test:25".to_string()
        }
    }

    #[tokio::test]
    async fn test_concurrent_sends_dispatch_once() {
        let store: Arc<dyn CardStore> = Arc::new(MemoryCardStore::new());
        let mailer = Arc::new(SlowMailer::default());
        let sender = CardSender::new(Arc::clone(&store), mailer.clone());

        let card = store
            .create(CardInput {
                card_type: Some(CardType::ThankYou),
                recipient_name: Some("Alex".to_string()),
                recipient_email: Some("alex@example.com".to_string()),
                sender_name: Some("Sam".to_string()),
                message: Some("Thanks!".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let (first, second) = tokio::join!(sender.send(&card.id), sender.send(&card.id));

        assert!(first.is_ok());
        assert!(matches!(second, Err(CardError::SendInProgress(_))));
        assert_eq!(mailer.deliveries.load(Ordering::SeqCst), 1);
        assert!(store.get(&card.id).await.unwrap().is_sent);

        // The claim is released once the first send finishes
        assert!(matches!(
            sender.send(&card.id).await,
            Err(CardError::AlreadySent(_))
        ));
    }

    #[test]
    fn test_text_fallback_defaults() {
        let text = EmailCardData::default().text_fallback();
        assert_eq!(
            text,
            "Thank You Card from Someone\n\nDear Friend,\n\nThank you!\n\nWith gratitude,\nSomeone"
        );
    }

    #[test]
    fn test_text_fallback_uses_card_data() {
        let data = EmailCardData {
            card_type: Some(CardType::Birthday),
            sender_name: Some("Sam".to_string()),
            recipient_name: Some("Alex".to_string()),
            message: Some("Have a great day".to_string()),
        };
        let text = data.text_fallback();
        assert!(text.starts_with("Happy Birthday from Sam"));
        assert!(text.contains("Dear Alex,"));
        assert!(text.ends_with("Happy Birthday from,\nSam"));
    }

    #[test]
    fn test_email_request_accepts_full_card_data() {
        let request: EmailRequest = serde_json::from_str(
            r##"{"to":"a@b.co","subject":"Hi","html":"<p>Hi</p>",
                "cardData":{"senderName":"Sam","backgroundColor":"#fff","id":"x"}}"##,
        )
        .unwrap();
        assert_eq!(
            request.card_data.unwrap().sender_name.as_deref(),
            Some("Sam")
        );
    }
}
