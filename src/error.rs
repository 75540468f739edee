use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::gate::RejectReason;

pub type Result<T> = std::result::Result<T, PortfolioError>;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Download(#[from] RejectReason),

    #[error("AI service is not configured")]
    AiUnavailable,

    #[error("AI service error: {0}")]
    AiService(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for PortfolioError {
    fn from(err: validator::ValidationErrors) -> Self {
        PortfolioError::Validation(err.to_string())
    }
}

impl From<reqwest::Error> for PortfolioError {
    fn from(err: reqwest::Error) -> Self {
        PortfolioError::AiService(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(error: &str, detail: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            detail: detail.into(),
        }
    }
}

impl PortfolioError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PortfolioError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PortfolioError::Download(reason) => match reason {
                RejectReason::InvalidToken | RejectReason::AutomatedClient => StatusCode::FORBIDDEN,
                RejectReason::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                RejectReason::ResourceMissing => StatusCode::NOT_FOUND,
            },
            PortfolioError::AiUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            PortfolioError::AiService(_) => StatusCode::BAD_GATEWAY,
            PortfolioError::Configuration(_)
            | PortfolioError::Io(_)
            | PortfolioError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            PortfolioError::Validation(_) => "validation_error",
            PortfolioError::Download(reason) => reason.code(),
            PortfolioError::AiUnavailable => "ai_unavailable",
            PortfolioError::AiService(_) => "ai_service_error",
            PortfolioError::Configuration(_) => "configuration_error",
            PortfolioError::Io(_) | PortfolioError::Internal(_) => "internal_error",
        }
    }

    fn client_detail(&self) -> String {
        match self {
            // internals stay in the logs
            PortfolioError::Io(_) | PortfolioError::Internal(_) | PortfolioError::Configuration(_) => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for PortfolioError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorResponse::new(self.error_code(), self.client_detail());
        let mut response = (status, Json(body)).into_response();

        if let PortfolioError::Download(RejectReason::RateLimited { retry_after }) = &self {
            let seconds = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
