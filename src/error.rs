use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::booking::BookingStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cannot {event} a booking that is {from}")]
    InvalidTransition { from: BookingStatus, event: String },

    #[error("booking {0} already has an assigned driver")]
    AlreadyAssigned(Uuid),

    #[error("user {user_id} already has active booking {booking_id}")]
    ConflictingActiveBooking { user_id: Uuid, booking_id: Uuid },

    #[error("{0} already registered")]
    DuplicateRegistration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("no available {0} nearby")]
    NoAvailableResources(&'static str),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::AlreadyAssigned(_) => "already_assigned",
            AppError::ConflictingActiveBooking { .. } => "conflicting_active_booking",
            AppError::DuplicateRegistration(_) => "duplicate_registration",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NoAvailableResources(_) => "no_available_resources",
            AppError::Persistence(_) => "persistence_failure",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. }
            | AppError::AlreadyAssigned(_)
            | AppError::ConflictingActiveBooking { .. }
            | AppError::DuplicateRegistration(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NoAvailableResources(_) | AppError::Persistence(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}
