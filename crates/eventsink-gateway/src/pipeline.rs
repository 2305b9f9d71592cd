//! Cross-cutting request pipeline applied to every route.
//!
//! Layers run outermost first:
//! 1. `x-request-id` assignment (kept if the client sent one), echoed on the response
//! 2. client origin resolution for logging
//! 3. access log (`TraceLayer`), one line per response
//! 4. panic recovery -> 500 JSON, process keeps serving
//! 5. request timeout -> 504
//!
//! Recovery and timeout sit inside the access log so recovered panics and
//! timed-out requests are still logged with their final status. Per-endpoint
//! instrumentation sits inside this stack (see `obs::instrument`).

use std::any::Any;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::extract::{ConnectInfo, Request};
use axum::http::{self, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use eventsink_core::EventSinkError;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{MakeSpan, OnResponse, TraceLayer};
use tracing::Span;

use crate::api::ApiError;
use crate::config::GatewayConfig;

const X_REQUEST_ID: &str = "x-request-id";

/// Wrap `router` in the request pipeline.
pub fn with_pipeline(router: Router, cfg: &GatewayConfig) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(middleware::from_fn(resolve_client_origin))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(RequestSpan)
                    .on_request(())
                    .on_response(AccessLog),
            )
            .layer(CatchPanicLayer::custom(recover_panic))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                cfg.request_timeout,
            )),
    )
}

fn recover_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "handler panicked");
    ApiError::from(EventSinkError::Internal("handler fault".into())).into_response()
}

// --------------------
// Client origin
// --------------------

/// Canonical client address, for logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOrigin(pub String);

/// Client address from proxy headers, most specific first.
pub fn origin_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &str| -> Option<IpAddr> {
        headers.get(name)?.to_str().ok()?.trim().parse().ok()
    };

    header_ip("true-client-ip")
        .or_else(|| header_ip("x-real-ip"))
        .or_else(|| {
            let forwarded = headers.get("x-forwarded-for")?.to_str().ok()?;
            forwarded.split(',').next()?.trim().parse().ok()
        })
}

async fn resolve_client_origin(mut req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let origin = origin_from_headers(req.headers())
        .or(peer)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    req.extensions_mut().insert(ClientOrigin(origin));
    next.run(req).await
}

// --------------------
// Access log
// --------------------

/// Span carrying the request's identity; the access log line is emitted inside it.
#[derive(Debug, Clone, Copy)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, req: &http::Request<B>) -> Span {
        let request_id = req
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        let client = req
            .extensions()
            .get::<ClientOrigin>()
            .map(|c| c.0.as_str())
            .unwrap_or("unknown");

        tracing::info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            client = %client,
        )
    }
}

/// One `info` line per finished request: status and duration.
#[derive(Debug, Clone, Copy)]
pub struct AccessLog;

impl<B> OnResponse<B> for AccessLog {
    fn on_response(self, res: &http::Response<B>, latency: Duration, _span: &Span) {
        tracing::info!(
            status = res.status().as_u16(),
            duration_ms = latency.as_secs_f64() * 1000.0,
            "request"
        );
    }
}
