use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::ChartError;

/// Error responses of the datafeed API
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad_request: {0}")]
    BadRequest(String),

    #[error("not_found: {0}")]
    NotFound(String),

    #[error("not_implemented")]
    NotImplemented,

    #[error("upstream_error: {0}")]
    Upstream(String),

    #[error("internal_error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "s": "error", "errmsg": self.to_string() });
        (self.status(), axum::Json(body)).into_response()
    }
}

impl From<ChartError> for ApiError {
    fn from(e: ChartError) -> Self {
        match e {
            ChartError::HttpError(_) | ChartError::TradeSourceError(_) => {
                Self::Upstream(e.to_string())
            }
            _ if e.is_not_found() => Self::NotFound(e.to_string()),
            _ => Self::Internal(format!("[{}] {}", e.error_code(), e)),
        }
    }
}
