use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Failure talking to the hosted backend. The backend's own message is kept
/// verbatim so it can be shown to the user.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("row not found")]
    NotFound,

    #[error("unexpected backend response: {0}")]
    Decode(String),
}

/// Failure of a coordinated mutation: rejected locally or by the backend, or
/// shared state left unusable by a panic.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Backend(String),

    #[error("Internal Server Error")]
    Internal,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Backend(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}

impl From<BackendError> for ApiError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unauthorized(message) => ApiError::Unauthorized(message),
            BackendError::NotFound => ApiError::NotFound("Record not found".to_string()),
            BackendError::Api { status: 409, message } => ApiError::Conflict(message),
            BackendError::Api { status: 400 | 422, message } => ApiError::BadRequest(message),
            other => ApiError::Backend(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::StudentNotFound(_) | StoreError::RecordNotFound(_) => {
                ApiError::NotFound(e.to_string())
            }
            StoreError::Busy(_) | StoreError::SlotBusy { .. } => ApiError::Conflict(e.to_string()),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Store(e) => e.into(),
            SyncError::Backend(e) => e.into(),
            SyncError::Poisoned(_) => {
                error!(error = %e, "Shared state unavailable");
                ApiError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn backend_messages_pass_through() {
        let api: ApiError = BackendError::Api {
            status: 500,
            message: "canceling statement due to statement timeout".into(),
        }
        .into();
        assert_eq!(api.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(api.to_string(), "canceling statement due to statement timeout");

        let api: ApiError = BackendError::Api {
            status: 422,
            message: "User already registered".into(),
        }
        .into();
        assert_eq!(api.status_code(), StatusCode::BAD_REQUEST);

        let api: ApiError = BackendError::Unauthorized("Invalid login credentials".into()).into();
        assert_eq!(api.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn store_conflicts_map_to_409() {
        let api: ApiError = SyncError::from(StoreError::Busy(Uuid::nil())).into();
        assert_eq!(api.status_code(), StatusCode::CONFLICT);
        let api: ApiError = StoreError::StudentNotFound(Uuid::nil()).into();
        assert_eq!(api.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn poisoned_state_is_an_internal_error() {
        let api: ApiError = SyncError::Poisoned("workspace").into();
        assert_eq!(api.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.to_string(), "Internal Server Error");
    }
}
