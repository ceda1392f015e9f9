//! Card persistence
//!
//! [`CardStore`] is the seam between the HTTP layer and storage. Two backends
//! exist: [`MemoryCardStore`] (lost on restart) and [`SqliteCardStore`].

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCardStore;
pub use sqlite::SqliteCardStore;

use crate::cards::types::{Card, CardFilter, CardInput, CardPage, CardUpdate, Pagination};
use crate::cards::validator::{validate_card, ValidationMode};
use crate::error::{CardError, Result};
use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

#[async_trait::async_trait]
pub trait CardStore: Send + Sync {
    /// Page of matching cards, newest first, with the pre-pagination total
    async fn list(&self, filter: CardFilter, page: Pagination) -> Result<CardPage>;

    /// Validate and insert a new draft card
    async fn create(&self, input: CardInput) -> Result<Card>;

    async fn get(&self, id: &str) -> Result<Card>;

    /// Merge, re-validate and store; `updatedAt` is refreshed
    async fn update(&self, id: &str, update: CardUpdate) -> Result<Card>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Transition a draft to sent; fails with `AlreadySent` the second time
    async fn mark_sent(&self, id: &str, message_id: &str) -> Result<Card>;

    /// Number of stored cards
    async fn count(&self) -> Result<usize>;
}

/// Current time at the microsecond precision every backend can store
pub fn timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// New globally unique card id
pub fn new_card_id() -> String {
    format!("card_{}", Uuid::new_v4().simple())
}

/// Strict validation shared by every backend before a write
pub(crate) fn check_card(card: &Card) -> Result<()> {
    let errors = validate_card(&card.draft(), ValidationMode::Strict);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CardError::Validation(errors))
    }
}

pub(crate) fn check_input(input: &CardInput) -> Result<()> {
    let errors = validate_card(&input.draft(), ValidationMode::Strict);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CardError::Validation(errors))
    }
}

pub(crate) fn not_found(id: &str) -> CardError {
    CardError::NotFound(id.to_string())
}
