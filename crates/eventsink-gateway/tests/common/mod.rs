#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use eventsink_core::EventStore;
use eventsink_gateway::{app_state::AppState, config::GatewayConfig, obs::HttpMetrics, router};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub metrics: Arc<HttpMetrics>,
    pub store: Arc<EventStore>,
}

pub fn app() -> TestApp {
    let metrics = Arc::new(HttpMetrics::new());
    let store = Arc::new(EventStore::new());
    let state = AppState::new(GatewayConfig::default(), Arc::clone(&store), Arc::clone(&metrics));
    TestApp { router: router::build_router(state), metrics, store }
}

pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let res = router.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().method(Method::GET).uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}
