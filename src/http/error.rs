use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::service::ServiceError;

use super::dto::ErrorBody;

/// Failed request, rendered as an [`ErrorBody`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    path: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, uri: &Uri) -> Self {
        Self {
            status,
            message: message.into(),
            path: uri.path().to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>, uri: &Uri) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, uri)
    }

    pub fn validation(problems: Vec<String>, uri: &Uri) -> Self {
        Self::bad_request(problems.join(", "), uri)
    }

    pub fn internal(message: impl Into<String>, uri: &Uri) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, uri)
    }

    pub fn service(err: ServiceError, uri: &Uri) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.to_string(), uri)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            timestamp: Utc::now(),
            message: self.message,
            error_id: Uuid::new_v4(),
            path: self.path,
        };

        if self.status.is_server_error() {
            error!(error_id = %body.error_id, path = %body.path, message = %body.message, "request failed");
        } else {
            warn!(error_id = %body.error_id, path = %body.path, status = self.status.as_u16(), message = %body.message, "request rejected");
        }

        (self.status, Json(body)).into_response()
    }
}
