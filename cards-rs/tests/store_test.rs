//! Integration tests for the card stores
//!
//! Every scenario runs against both backends.

use cards_rs::cards::store::{CardStore, MemoryCardStore, SqliteCardStore};
use cards_rs::cards::types::{CardFilter, CardInput, CardType, CardUpdate, Pagination};
use cards_rs::CardError;
use sqlx::sqlite::SqlitePoolOptions;

/// Helper to create an in-memory database for testing
async fn sqlite_store() -> SqliteCardStore {
    // One connection, otherwise every connection sees its own empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    let store = SqliteCardStore::new(pool);
    store.init_db().await.unwrap();
    store
}

async fn stores() -> Vec<(&'static str, Box<dyn CardStore>)> {
    vec![
        ("memory", Box::new(MemoryCardStore::new())),
        ("sqlite", Box::new(sqlite_store().await)),
    ]
}

fn alex_card() -> CardInput {
    CardInput {
        card_type: Some(CardType::ThankYou),
        recipient_name: Some("Alex".to_string()),
        recipient_email: Some("alex@example.com".to_string()),
        sender_name: Some("Sam".to_string()),
        message: Some("Thanks!".to_string()),
        ..Default::default()
    }
}

fn named(name: &str) -> CardInput {
    CardInput {
        recipient_name: Some(name.to_string()),
        ..alex_card()
    }
}

#[tokio::test]
async fn test_create_then_get() {
    for (backend, store) in stores().await {
        let created = store.create(alex_card()).await.unwrap();

        assert!(created.id.starts_with("card_"), "{}", backend);
        assert_eq!(created.recipient_name, "Alex");
        assert_eq!(created.recipient_email, "alex@example.com");
        assert_eq!(created.sender_name, "Sam");
        assert_eq!(created.message, "Thanks!");
        assert_eq!(created.card_type, CardType::ThankYou);
        assert_eq!(created.background_color, "#ffffff");
        assert_eq!(created.font_size, "16px");
        assert!(!created.is_sent);
        assert!(created.sent_at.is_none());
        assert_eq!(created.created_at, created.updated_at);

        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched, created, "{}", backend);
    }
}

#[tokio::test]
async fn test_create_rejects_invalid_input() {
    for (backend, store) in stores().await {
        let result = store
            .create(CardInput {
                recipient_email: Some("not-an-email".to_string()),
                message: None,
                ..alex_card()
            })
            .await;

        match result {
            Err(CardError::Validation(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["recipientEmail", "message"], "{}", backend);
            }
            other => panic!("{}: expected validation error, got {:?}", backend, other),
        }
        assert_eq!(store.count().await.unwrap(), 0);
    }
}

#[tokio::test]
async fn test_get_missing_card() {
    for (backend, store) in stores().await {
        let result = store.get("card_missing").await;
        assert!(matches!(result, Err(CardError::NotFound(_))), "{}", backend);
    }
}

#[tokio::test]
async fn test_update_merges_fields() {
    for (backend, store) in stores().await {
        let card = store.create(alex_card()).await.unwrap();

        let updated = store
            .update(
                &card.id,
                CardUpdate {
                    message: Some("Thanks again!".to_string()),
                    background_color: Some("#fafafa".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.message, "Thanks again!", "{}", backend);
        assert_eq!(updated.background_color, "#fafafa");
        assert_eq!(updated.recipient_name, "Alex");
        assert_eq!(updated.created_at, card.created_at);
        assert!(updated.updated_at >= card.updated_at);

        let fetched = store.get(&card.id).await.unwrap();
        assert_eq!(fetched, updated, "{}", backend);
    }
}

#[tokio::test]
async fn test_update_rejects_invalid_merge() {
    for (backend, store) in stores().await {
        let card = store.create(alex_card()).await.unwrap();

        let result = store
            .update(
                &card.id,
                CardUpdate {
                    recipient_name: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(CardError::Validation(_))), "{}", backend);

        let fetched = store.get(&card.id).await.unwrap();
        assert_eq!(fetched.recipient_name, "Alex", "{}", backend);
    }
}

#[tokio::test]
async fn test_update_missing_card() {
    for (backend, store) in stores().await {
        let result = store.update("card_missing", CardUpdate::default()).await;
        assert!(matches!(result, Err(CardError::NotFound(_))), "{}", backend);
    }
}

#[tokio::test]
async fn test_delete() {
    for (backend, store) in stores().await {
        let card = store.create(alex_card()).await.unwrap();

        store.delete(&card.id).await.unwrap();
        assert!(matches!(store.get(&card.id).await, Err(CardError::NotFound(_))));
        assert!(
            matches!(store.delete(&card.id).await, Err(CardError::NotFound(_))),
            "{}",
            backend
        );
    }
}

#[tokio::test]
async fn test_mark_sent_only_once() {
    for (backend, store) in stores().await {
        let card = store.create(alex_card()).await.unwrap();

        let sent = store
            .mark_sent(&card.id, "<1@thankyoucards.local>")
            .await
            .unwrap();
        assert!(sent.is_sent, "{}", backend);
        assert!(sent.sent_at.is_some());
        assert_eq!(sent.message_id.as_deref(), Some("<1@thankyoucards.local>"));

        let again = store.mark_sent(&card.id, "<2@thankyoucards.local>").await;
        assert!(matches!(again, Err(CardError::AlreadySent(_))), "{}", backend);

        let fetched = store.get(&card.id).await.unwrap();
        assert!(fetched.is_sent);
        assert_eq!(fetched.message_id.as_deref(), Some("<1@thankyoucards.local>"));
        assert_eq!(fetched.sent_at, sent.sent_at);

        let missing = store.mark_sent("card_missing", "<3@x>").await;
        assert!(matches!(missing, Err(CardError::NotFound(_))), "{}", backend);
    }
}

#[tokio::test]
async fn test_editing_sent_card_keeps_it_sent() {
    for (backend, store) in stores().await {
        let card = store.create(alex_card()).await.unwrap();
        store.mark_sent(&card.id, "<1@x>").await.unwrap();

        let updated = store
            .update(
                &card.id,
                CardUpdate {
                    message: Some("Edited".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.is_sent, "{}", backend);
        assert!(updated.sent_at.is_some());
    }
}

#[tokio::test]
async fn test_list_newest_first_with_limit() {
    for (backend, store) in stores().await {
        for name in ["First", "Second", "Third"] {
            store.create(named(name)).await.unwrap();
        }

        let page = store
            .list(CardFilter::default(), Pagination::new(2, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 3, "{}", backend);
        let names: Vec<&str> = page
            .cards
            .iter()
            .map(|c| c.recipient_name.as_str())
            .collect();
        assert_eq!(names, vec!["Third", "Second"], "{}", backend);

        let page = store
            .list(CardFilter::default(), Pagination::new(2, 2))
            .await
            .unwrap();
        let names: Vec<&str> = page
            .cards
            .iter()
            .map(|c| c.recipient_name.as_str())
            .collect();
        assert_eq!(names, vec!["First"], "{}", backend);
    }
}

#[tokio::test]
async fn test_list_filters_by_sent() {
    for (backend, store) in stores().await {
        let draft = store.create(named("Draft")).await.unwrap();
        let sent = store.create(named("Sent")).await.unwrap();
        store.mark_sent(&sent.id, "<1@x>").await.unwrap();

        let page = store
            .list(CardFilter { is_sent: Some(true) }, Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1, "{}", backend);
        assert_eq!(page.cards[0].id, sent.id);

        let page = store
            .list(CardFilter { is_sent: Some(false) }, Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1, "{}", backend);
        assert_eq!(page.cards[0].id, draft.id);

        assert_eq!(store.count().await.unwrap(), 2);
    }
}

#[tokio::test]
async fn test_sqlite_schema_setup_is_repeatable() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    let first = SqliteCardStore::new(pool.clone());
    first.init_db().await.unwrap();
    let card = first.create(alex_card()).await.unwrap();

    let second = SqliteCardStore::new(pool);
    second.init_db().await.unwrap();
    assert_eq!(second.get(&card.id).await.unwrap(), card);
}
