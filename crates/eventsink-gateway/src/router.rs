//! Axum router wiring.
//!
//! Routes:
//! - `GET /healthz`  (instrumented)
//! - `GET /metrics`
//! - `POST /events`, `GET /events` (instrumented)
//!
//! Instrumentation is attached with `route_layer`, so only registered
//! methods are measured; 405 and 404 answers never create metric series.
//! All routes, and the 404 fallback, run through `pipeline::with_pipeline`.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::{api::events, app_state::AppState, obs::InstrumentLayer, ops, pipeline};

pub fn build_router(state: AppState) -> Router {
    let metrics = state.metrics();
    let cfg = state.cfg().clone();

    let routes = Router::new()
        .route(
            "/healthz",
            get(ops::healthz).route_layer(InstrumentLayer::new("/healthz", Arc::clone(&metrics))),
        )
        .route("/metrics", get(ops::metrics))
        .route(
            "/events",
            post(events::create_event)
                .get(events::list_events)
                .route_layer(InstrumentLayer::new("/events", metrics)),
        )
        .with_state(state);

    pipeline::with_pipeline(routes, &cfg)
}
