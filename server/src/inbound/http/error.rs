//! Adapter-level error mapping from store/control failures to HTTP
//! responses. Domain and persistence types stay free of framework concerns;
//! this module translates them into Actix responses with a JSON payload.

use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domain::ports::ControlError;
use crate::outbound::persistence::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("storage failure")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("worker pool unavailable")]
    Blocking,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl From<BlockingError> for ApiError {
    fn from(_: BlockingError) -> Self {
        Self::Blocking
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Control(ControlError::UnsupportedAction { .. }) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Control(_) | Self::Blocking => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!(error = %self, "request failed");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Run a synchronous store closure on the blocking pool and fold both
/// failure layers into [`ApiError`].
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    Ok(web::block(f).await??)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_error_kinds_to_status() {
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("host").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(ControlError::TokenMissing).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(ControlError::unsupported_action("reboot")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Blocking.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(ApiError::NotFound("host").to_string(), "host not found");
    }
}
