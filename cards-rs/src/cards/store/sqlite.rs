//! SQLite-backed card store

use super::{check_card, check_input, new_card_id, not_found, timestamp, CardStore};
use crate::cards::types::{Card, CardFilter, CardInput, CardPage, CardUpdate, Pagination};
use crate::error::{CardError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use tracing::debug;

const CARD_COLUMNS: &str = "id, card_type, recipient_name, recipient_email, sender_name, message, \
     background_color, text_color, border_color, font_family, font_size, pattern, image_url, \
     created_at, updated_at, sent_at, message_id, is_sent";

/// Card store with database persistence
pub struct SqliteCardStore {
    db: SqlitePool,
}

impl SqliteCardStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Connect and make sure the schema exists
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options: sqlx::sqlite::SqliteConnectOptions = database_url
            .parse::<sqlx::sqlite::SqliteConnectOptions>()?
            .create_if_missing(true);
        let db = SqlitePool::connect_with(options).await?;
        let store = Self::new(db);
        store.init_db().await?;
        Ok(store)
    }

    /// Initialize the cards table
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                card_type TEXT NOT NULL,
                recipient_name TEXT NOT NULL,
                recipient_email TEXT NOT NULL,
                sender_name TEXT NOT NULL,
                message TEXT NOT NULL,
                background_color TEXT NOT NULL,
                text_color TEXT NOT NULL,
                border_color TEXT NOT NULL,
                font_family TEXT NOT NULL,
                font_size TEXT NOT NULL,
                pattern TEXT NOT NULL,
                image_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                sent_at TEXT,
                message_id TEXT,
                is_sent BOOLEAN NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cards_created_at ON cards(created_at)")
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn select_card<'e, E>(executor: E, id: &str) -> Result<Option<Card>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query(&format!("SELECT {} FROM cards WHERE id = ?", CARD_COLUMNS))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        row.map(|row| row_to_card(&row)).transpose()
    }
}

/// Fixed-width timestamps so text ordering matches time ordering
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| CardError::Internal(format!("Invalid timestamp '{}': {}", value, e)))
}

fn row_to_card(row: &SqliteRow) -> Result<Card> {
    let card_type: String = row.try_get("card_type")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let sent_at: Option<String> = row.try_get("sent_at")?;

    Ok(Card {
        id: row.try_get("id")?,
        card_type: card_type.into(),
        recipient_name: row.try_get("recipient_name")?,
        recipient_email: row.try_get("recipient_email")?,
        sender_name: row.try_get("sender_name")?,
        message: row.try_get("message")?,
        background_color: row.try_get("background_color")?,
        text_color: row.try_get("text_color")?,
        border_color: row.try_get("border_color")?,
        font_family: row.try_get("font_family")?,
        font_size: row.try_get("font_size")?,
        pattern: row.try_get("pattern")?,
        image_url: row.try_get("image_url")?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        sent_at: sent_at.as_deref().map(parse_ts).transpose()?,
        message_id: row.try_get("message_id")?,
        is_sent: row.try_get("is_sent")?,
    })
}

#[async_trait::async_trait]
impl CardStore for SqliteCardStore {
    async fn list(&self, filter: CardFilter, page: Pagination) -> Result<CardPage> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cards WHERE (?1 IS NULL OR is_sent = ?1)")
                .bind(filter.is_sent)
                .fetch_one(&self.db)
                .await?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM cards WHERE (?1 IS NULL OR is_sent = ?1) \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
            CARD_COLUMNS
        ))
        .bind(filter.is_sent)
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.db)
        .await?;

        let cards = rows
            .iter()
            .map(row_to_card)
            .collect::<Result<Vec<_>>>()?;

        Ok(CardPage {
            cards,
            total: total as usize,
        })
    }

    async fn create(&self, input: CardInput) -> Result<Card> {
        check_input(&input)?;

        let card = Card::from_input(new_card_id(), input, timestamp());

        sqlx::query(&format!(
            "INSERT INTO cards ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            CARD_COLUMNS
        ))
        .bind(&card.id)
        .bind(card.card_type.as_str())
        .bind(&card.recipient_name)
        .bind(&card.recipient_email)
        .bind(&card.sender_name)
        .bind(&card.message)
        .bind(&card.background_color)
        .bind(&card.text_color)
        .bind(&card.border_color)
        .bind(&card.font_family)
        .bind(&card.font_size)
        .bind(&card.pattern)
        .bind(&card.image_url)
        .bind(format_ts(&card.created_at))
        .bind(format_ts(&card.updated_at))
        .bind(card.sent_at.as_ref().map(format_ts))
        .bind(&card.message_id)
        .bind(card.is_sent)
        .execute(&self.db)
        .await?;

        debug!("Created card {}", card.id);
        Ok(card)
    }

    async fn get(&self, id: &str) -> Result<Card> {
        Self::select_card(&self.db, id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn update(&self, id: &str, update: CardUpdate) -> Result<Card> {
        let mut tx = self.db.begin().await?;

        let mut card = Self::select_card(&mut *tx, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        update.apply(&mut card);
        check_card(&card)?;
        card.updated_at = timestamp();

        sqlx::query(
            r#"
            UPDATE cards SET
                card_type = ?, recipient_name = ?, recipient_email = ?, sender_name = ?,
                message = ?, background_color = ?, text_color = ?, border_color = ?,
                font_family = ?, font_size = ?, pattern = ?, image_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(card.card_type.as_str())
        .bind(&card.recipient_name)
        .bind(&card.recipient_email)
        .bind(&card.sender_name)
        .bind(&card.message)
        .bind(&card.background_color)
        .bind(&card.text_color)
        .bind(&card.border_color)
        .bind(&card.font_family)
        .bind(&card.font_size)
        .bind(&card.pattern)
        .bind(&card.image_url)
        .bind(format_ts(&card.updated_at))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Updated card {}", id);
        Ok(card)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM cards WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        debug!("Deleted card {}", id);
        Ok(())
    }

    async fn mark_sent(&self, id: &str, message_id: &str) -> Result<Card> {
        let now = format_ts(&timestamp());

        // Single conditional update so two senders cannot both win
        let result = sqlx::query(
            "UPDATE cards SET is_sent = 1, sent_at = ?, updated_at = ?, message_id = ? \
             WHERE id = ? AND is_sent = 0",
        )
        .bind(&now)
        .bind(&now)
        .bind(message_id)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return match Self::select_card(&self.db, id).await? {
                Some(_) => Err(CardError::AlreadySent(id.to_string())),
                None => Err(not_found(id)),
            };
        }

        debug!("Marked card {} as sent ({})", id, message_id);
        self.get(id).await
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cards")
            .fetch_one(&self.db)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_format_round_trips() {
        let now = timestamp();
        let parsed = parse_ts(&format_ts(&now)).unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_timestamps_sort_lexicographically() {
        let earlier = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = DateTime::parse_from_rfc3339("2026-01-02T03:04:05.5Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(format_ts(&earlier) < format_ts(&later));
    }
}
