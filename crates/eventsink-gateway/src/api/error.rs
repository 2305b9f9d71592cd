//! HTTP mapping for `EventSinkError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eventsink_core::EventSinkError;
use serde_json::json;

/// Handler error rendered as `{"error": CODE, "message": ...}`.
#[derive(Debug)]
pub struct ApiError(pub EventSinkError);

impl From<EventSinkError> for ApiError {
    fn from(err: EventSinkError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            EventSinkError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EventSinkError::InvalidConfig(_) | EventSinkError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        (self.status(), body).into_response()
    }
}
