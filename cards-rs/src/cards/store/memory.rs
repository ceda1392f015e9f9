//! In-memory card store
//!
//! Every mutation runs under one mutex, which keeps read-modify-write on a
//! record atomic. Nothing survives a restart.

use super::{check_card, check_input, new_card_id, not_found, timestamp, CardStore};
use crate::cards::types::{Card, CardFilter, CardInput, CardPage, CardUpdate, Pagination};
use crate::error::{CardError, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

struct Entry {
    /// Insertion sequence, tie-break for equal `created_at`
    seq: u64,
    card: Card,
}

#[derive(Default)]
struct Inner {
    cards: HashMap<String, Entry>,
    next_seq: u64,
}

#[derive(Default)]
pub struct MemoryCardStore {
    inner: Mutex<Inner>,
}

impl MemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CardStore for MemoryCardStore {
    async fn list(&self, filter: CardFilter, page: Pagination) -> Result<CardPage> {
        let inner = self.inner.lock().await;

        let mut matches: Vec<&Entry> = inner
            .cards
            .values()
            .filter(|entry| filter.matches(&entry.card))
            .collect();
        matches.sort_by(|a, b| {
            b.card
                .created_at
                .cmp(&a.card.created_at)
                .then(b.seq.cmp(&a.seq))
        });

        let total = matches.len();
        let cards = matches
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .map(|entry| entry.card.clone())
            .collect();

        Ok(CardPage { cards, total })
    }

    async fn create(&self, input: CardInput) -> Result<Card> {
        check_input(&input)?;

        let mut inner = self.inner.lock().await;
        let mut id = new_card_id();
        while inner.cards.contains_key(&id) {
            id = new_card_id();
        }

        let card = Card::from_input(id.clone(), input, timestamp());
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.cards.insert(
            id.clone(),
            Entry {
                seq,
                card: card.clone(),
            },
        );

        debug!("Created card {}", id);
        Ok(card)
    }

    async fn get(&self, id: &str) -> Result<Card> {
        let inner = self.inner.lock().await;
        inner
            .cards
            .get(id)
            .map(|entry| entry.card.clone())
            .ok_or_else(|| not_found(id))
    }

    async fn update(&self, id: &str, update: CardUpdate) -> Result<Card> {
        let mut inner = self.inner.lock().await;
        let entry = inner.cards.get_mut(id).ok_or_else(|| not_found(id))?;

        let mut merged = entry.card.clone();
        update.apply(&mut merged);
        check_card(&merged)?;
        merged.updated_at = timestamp();

        entry.card = merged.clone();
        debug!("Updated card {}", id);
        Ok(merged)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.cards.remove(id).ok_or_else(|| not_found(id))?;
        debug!("Deleted card {}", id);
        Ok(())
    }

    async fn mark_sent(&self, id: &str, message_id: &str) -> Result<Card> {
        let mut inner = self.inner.lock().await;
        let entry = inner.cards.get_mut(id).ok_or_else(|| not_found(id))?;

        if entry.card.is_sent {
            return Err(CardError::AlreadySent(id.to_string()));
        }

        let now = timestamp();
        entry.card.is_sent = true;
        entry.card.sent_at = Some(now);
        entry.card.updated_at = now;
        entry.card.message_id = Some(message_id.to_string());

        debug!("Marked card {} as sent ({})", id, message_id);
        Ok(entry.card.clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.lock().await.cards.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::types::CardType;

    fn input(name: &str) -> CardInput {
        CardInput {
            card_type: Some(CardType::ThankYou),
            recipient_name: Some(name.to_string()),
            recipient_email: Some("alex@example.com".to_string()),
            sender_name: Some("Sam".to_string()),
            message: Some("Thanks!".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_on_equal_timestamps() {
        let store = MemoryCardStore::new();
        let first = store.create(input("First")).await.unwrap();
        let second = store.create(input("Second")).await.unwrap();

        // Force identical creation times so ordering relies on insertion order
        {
            let mut inner = store.inner.lock().await;
            let ts = inner.cards[&first.id].card.created_at;
            inner.cards.get_mut(&second.id).unwrap().card.created_at = ts;
        }

        let page = store
            .list(CardFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.cards[0].id, second.id);
        assert_eq!(page.cards[1].id, first.id);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_card_untouched() {
        let store = MemoryCardStore::new();
        let card = store.create(input("Alex")).await.unwrap();

        let result = store
            .update(
                &card.id,
                CardUpdate {
                    recipient_email: Some("broken".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(CardError::Validation(_))));

        let stored = store.get(&card.id).await.unwrap();
        assert_eq!(stored, card);
    }
}
