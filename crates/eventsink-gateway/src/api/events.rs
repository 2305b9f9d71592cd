//! `/events` handlers.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use eventsink_core::event::INVALID_EVENT_MSG;
use eventsink_core::{EventSinkError, NewEvent, StoredEvent};

use super::ApiError;
use crate::app_state::AppState;

/// `POST /events`: decode, validate, store.
///
/// The body is parsed regardless of `Content-Type`.
pub async fn create_event(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<StoredEvent>), ApiError> {
    let candidate: NewEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "rejecting event body");
        EventSinkError::BadRequest(INVALID_EVENT_MSG.into())
    })?;
    candidate.validate()?;

    let stored = state.store().add(candidate);
    Ok((StatusCode::CREATED, Json(stored)))
}

/// `GET /events`: the newest page, newest first.
pub async fn list_events(State(state): State<AppState>) -> Json<Vec<StoredEvent>> {
    let limit = i64::try_from(state.cfg().list_page_size).unwrap_or(i64::MAX);
    Json(state.store().list(limit))
}
