//! JSON envelopes shared by every endpoint
//!
//! Success: `{success: true, data | message, ...}`.
//! Failure: `{success: false, error, validationErrors?}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

use crate::config::Environment;
use crate::error::{CardError, FieldError};

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
        }
    }
}

/// Failure envelope with its HTTP status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub validation_errors: Option<Vec<FieldError>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_errors: Option<&'a [FieldError]>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &str) -> Self {
        Self {
            status,
            error: error.to_string(),
            validation_errors: None,
        }
    }

    /// Map a domain error; production hides transport and internal details
    pub fn from_card_error(err: CardError, environment: Environment) -> Self {
        let production = environment.is_production();
        match err {
            CardError::Validation(errors) => {
                debug!("Validation failed: {:?}", errors);
                let error = match errors.as_slice() {
                    [only] => only.message.clone(),
                    _ => "Validation failed".to_string(),
                };
                Self {
                    status: StatusCode::BAD_REQUEST,
                    error,
                    validation_errors: Some(errors),
                }
            }
            CardError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "Card not found"),
            CardError::AlreadySent(_) => {
                Self::new(StatusCode::CONFLICT, "Card has already been sent")
            }
            CardError::SendInProgress(_) => {
                Self::new(StatusCode::CONFLICT, "Card is already being sent")
            }
            CardError::Transport(message) => {
                error!("Mail transport failure: {}", message);
                let message = if production {
                    "Failed to send email".to_string()
                } else {
                    message
                };
                Self::new(StatusCode::BAD_GATEWAY, &message)
            }
            other => {
                error!("Internal error: {}", other);
                let message = if production {
                    "Internal server error".to_string()
                } else {
                    other.to_string()
                };
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, &message)
            }
        }
    }

    /// Malformed, mistyped or unknown-field JSON bodies; oversized bodies keep 413
    pub fn bad_json(rejection: JsonRejection) -> Self {
        debug!("Rejected JSON body: {}", rejection.body_text());
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            error: rejection.body_text(),
            validation_errors: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.error,
            validation_errors: self.validation_errors.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}
