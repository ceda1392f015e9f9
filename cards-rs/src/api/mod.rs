//! REST API module
//!
//! JSON endpoints for managing and sending greeting cards

pub mod handlers;
pub mod rate_limit;
pub mod response;
pub mod server;

pub use handlers::AppState;
pub use response::{ApiError, ApiResponse};
pub use server::ApiServer;
