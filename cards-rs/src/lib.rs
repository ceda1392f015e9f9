//! cards-rs: greeting card service
//!
//! Stores greeting cards, renders them as HTML e-mails and delivers them over
//! SMTP, behind a small JSON REST API.
//!
//! # Features
//!
//! - **Cards**: create, edit, list and delete drafts; a sent card stays sent
//! - **Rendering**: inline-styled HTML plus a plain-text alternative
//! - **Delivery**: pooled SMTP through lettre, or a logging mailer
//! - **Storage**: in-memory or SQLite
//!
//! # Example
//!
//! ```no_run
//! use cards_rs::api::ApiServer;
//! use cards_rs::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.apply_env()?;
//!
//!     let server = ApiServer::from_config(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`api`]: HTTP routes, middleware and server
//! - [`cards`]: card model, validation, rendering, storage and dispatch
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`mailer`]: outgoing mail transports

pub mod api;
pub mod cards;
pub mod config;
pub mod error;
pub mod mailer;

pub use config::Config;
pub use error::{CardError, Result};
