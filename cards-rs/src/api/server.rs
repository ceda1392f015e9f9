//! API Server - HTTP server for the card REST API

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::handlers::{self, AppState};
use super::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::cards::store::{CardStore, MemoryCardStore, SqliteCardStore};
use crate::config::{Config, StorageBackend};
use crate::error::Result;
use crate::mailer::{LogMailer, Mailer, SmtpMailer};

/// API Server configuration
pub struct ApiServer {
    state: Arc<AppState>,
    config: Config,
}

impl ApiServer {
    pub fn new(config: Config, store: Arc<dyn CardStore>, mailer: Arc<dyn Mailer>) -> Self {
        let state = Arc::new(AppState::new(store, mailer, config.server.environment));
        Self { state, config }
    }

    /// Build the store and mailer the configuration asks for
    pub async fn from_config(config: Config) -> Result<Self> {
        let store: Arc<dyn CardStore> = match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory card store");
                Arc::new(MemoryCardStore::new())
            }
            StorageBackend::Sqlite => {
                info!("Using SQLite card store at {}", config.storage.database_url);
                Arc::new(SqliteCardStore::connect(&config.storage.database_url).await?)
            }
        };

        let mailer: Arc<dyn Mailer> = if config.smtp.enabled {
            Arc::new(SmtpMailer::new(
                config.smtp.clone(),
                config.server.environment,
            )?)
        } else {
            warn!("SMTP disabled, e-mails will only be logged");
            Arc::new(LogMailer::new(
                config.smtp.from_email.clone(),
                config.smtp.endpoint(),
            ))
        };

        Ok(Self::new(config, store, mailer))
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let environment = self.config.server.environment;

        let origins: Vec<HeaderValue> = self
            .config
            .cors
            .origins(environment)
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin {}", origin);
                    None
                }
            })
            .collect();

        let cors = CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION])
            .allow_credentials(true);

        let mut api_routes = Router::new()
            .route("/health", get(handlers::health))
            .route(
                "/cards",
                get(handlers::list_cards).post(handlers::create_card),
            )
            .route("/cards/preview", post(handlers::preview_card))
            .route(
                "/cards/:id",
                get(handlers::get_card)
                    .put(handlers::update_card)
                    .delete(handlers::delete_card),
            )
            .route("/cards/:id/send", post(handlers::send_card))
            .route("/email/send", post(handlers::send_email))
            .route("/send-card", post(handlers::send_email));

        let limits = &self.config.rate_limit;
        if limits.is_enabled(environment) {
            info!(
                "Rate limiting /api: {} requests per {}s",
                limits.max_requests, limits.window_secs
            );
            let limiter = Arc::new(RateLimiter::new(limits.max_requests, limits.window_secs));
            api_routes = api_routes.route_layer(middleware::from_fn_with_state(
                limiter,
                rate_limit_middleware,
            ));
        }

        Router::new()
            .route("/", get(handlers::index))
            .nest("/api", api_routes)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.config.server.max_body_bytes))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    /// Start the API server
    pub async fn run(&self) -> std::io::Result<()> {
        let router = self.router();
        let addr = &self.config.server.listen_addr;

        info!(
            "Starting API server on {} ({})",
            addr,
            self.config.server.environment.as_str()
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}
