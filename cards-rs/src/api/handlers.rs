//! API request handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::response::{ApiError, ApiResponse};
use crate::cards::renderer::{render_preview, RenderedCard};
use crate::cards::sender::{CardSender, EmailRequest, SendReceipt};
use crate::cards::store::CardStore;
use crate::cards::types::{Card, CardInput, CardUpdate, ListQuery};
use crate::config::Environment;
use crate::error::CardError;
use crate::mailer::Mailer;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn CardStore>,
    pub mailer: Arc<dyn Mailer>,
    pub sender: CardSender,
    pub environment: Environment,
}

impl AppState {
    pub fn new(store: Arc<dyn CardStore>, mailer: Arc<dyn Mailer>, environment: Environment) -> Self {
        Self {
            sender: CardSender::new(Arc::clone(&store), Arc::clone(&mailer)),
            store,
            mailer,
            environment,
        }
    }

    fn fail(&self, err: CardError) -> ApiError {
        ApiError::from_card_error(err, self.environment)
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ServiceIndex {
    pub service: &'static str,
    pub version: &'static str,
    pub environment: &'static str,
    pub endpoints: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub environment: &'static str,
    pub timestamp: String,
    pub smtp: String,
    pub version: &'static str,
    pub cards: usize,
}

#[derive(Debug, Serialize)]
pub struct CardListResponse {
    pub success: bool,
    pub data: Vec<Card>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    pub message_id: String,
    pub environment: &'static str,
}

/// GET / - Service index
pub async fn index(State(state): State<Arc<AppState>>) -> Json<ServiceIndex> {
    Json(ServiceIndex {
        service: "Thank You Cards API",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.environment.as_str(),
        endpoints: vec![
            "GET /api/health",
            "GET /api/cards",
            "POST /api/cards",
            "GET /api/cards/:id",
            "PUT /api/cards/:id",
            "DELETE /api/cards/:id",
            "POST /api/cards/:id/send",
            "POST /api/cards/preview",
            "POST /api/email/send",
        ],
    })
}

/// GET /api/health - Liveness and configuration summary
pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let cards = state.store.count().await.map_err(|e| state.fail(e))?;

    Ok(Json(HealthResponse {
        status: "ok",
        environment: state.environment.as_str(),
        timestamp: Utc::now().to_rfc3339(),
        smtp: state.mailer.endpoint(),
        version: env!("CARGO_PKG_VERSION"),
        cards,
    }))
}

/// GET /api/cards - List cards, newest first
pub async fn list_cards(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<CardListResponse>> {
    let page = query.pagination();
    let result = state
        .store
        .list(query.filter(), page)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(CardListResponse {
        success: true,
        data: result.cards,
        total: result.total,
        limit: page.limit,
        offset: page.offset,
    }))
}

/// POST /api/cards - Create a draft card
pub async fn create_card(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CardInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Card>>)> {
    let Json(input) = payload.map_err(ApiError::bad_json)?;
    let card = state.store.create(input).await.map_err(|e| state.fail(e))?;

    info!("Card {} created for {}", card.id, card.recipient_email);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(card).with_message("Card created successfully")),
    ))
}

/// GET /api/cards/:id
pub async fn get_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Card>>> {
    let card = state.store.get(&id).await.map_err(|e| state.fail(e))?;
    Ok(Json(ApiResponse::data(card)))
}

/// PUT /api/cards/:id - Merge a partial update
pub async fn update_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<CardUpdate>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Card>>> {
    let Json(update) = payload.map_err(ApiError::bad_json)?;
    let card = state
        .store
        .update(&id, update)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(
        ApiResponse::data(card).with_message("Card updated successfully"),
    ))
}

/// DELETE /api/cards/:id
pub async fn delete_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.store.delete(&id).await.map_err(|e| state.fail(e))?;

    info!("Card {} deleted", id);
    Ok(Json(ApiResponse::message("Card deleted successfully")))
}

/// POST /api/cards/:id/send - Render and mail a stored card
pub async fn send_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<SendReceipt>>> {
    let receipt = state.sender.send(&id).await.map_err(|e| state.fail(e))?;

    Ok(Json(
        ApiResponse::data(receipt).with_message("Card sent successfully"),
    ))
}

/// POST /api/cards/preview - Render without storing
pub async fn preview_card(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CardInput>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<RenderedCard>>> {
    let Json(input) = payload.map_err(ApiError::bad_json)?;
    let rendered = render_preview(input).map_err(|e| state.fail(e))?;
    Ok(Json(ApiResponse::data(rendered)))
}

/// POST /api/email/send - Send caller-built HTML
///
/// Also mounted at `/api/send-card` for older clients.
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> ApiResult<Json<SendEmailResponse>> {
    let Json(request) = payload.map_err(ApiError::bad_json)?;
    let message_id = state
        .sender
        .send_adhoc(request)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(SendEmailResponse {
        success: true,
        message_id,
        environment: state.environment.as_str(),
    }))
}
