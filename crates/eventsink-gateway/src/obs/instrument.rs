//! Per-endpoint instrumentation wrapper.
//!
//! `InstrumentLayer` wraps a route's service and, once per request, records
//! the response status into `http_requests_total` and the wall-clock time from
//! wrapper entry to handler return into `http_request_duration_seconds`. The
//! response itself passes through untouched.

use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::http::{Method, Request, Response, StatusCode};
use tower::{Layer, Service};

use super::metrics::HttpMetrics;

/// Human-readable status text used as the `code` label.
pub fn status_text(status: StatusCode) -> Cow<'static, str> {
    match status.canonical_reason() {
        Some(reason) => Cow::Borrowed(reason),
        None => Cow::Owned(status.as_str().to_string()),
    }
}

// ---------------------------------------------------------------------------
// InstrumentLayer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct InstrumentLayer {
    route: &'static str,
    metrics: Arc<HttpMetrics>,
}

impl InstrumentLayer {
    pub fn new(route: &'static str, metrics: Arc<HttpMetrics>) -> Self {
        Self { route, metrics }
    }
}

impl<S> Layer<S> for InstrumentLayer {
    type Service = Instrumented<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Instrumented {
            inner,
            route: self.route,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

// ---------------------------------------------------------------------------
// Instrumented
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Instrumented<S> {
    inner: S,
    route: &'static str,
    metrics: Arc<HttpMetrics>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for Instrumented<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut probe = Probe::start(self.route, req.method().clone(), Arc::clone(&self.metrics));
        let fut = self.inner.call(req);

        Box::pin(async move {
            let result = fut.await;
            probe.observe(match &result {
                Ok(res) => res.status(),
                Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
            });
            result
        })
    }
}

/// Per-request timer and captured status.
///
/// Records exactly once, on drop. A request whose future is dropped before
/// producing a response (panic unwinding, timeout) counts as a 500.
struct Probe {
    route: &'static str,
    method: Method,
    metrics: Arc<HttpMetrics>,
    start: Instant,
    status: Option<StatusCode>,
}

impl Probe {
    fn start(route: &'static str, method: Method, metrics: Arc<HttpMetrics>) -> Self {
        Self { route, method, metrics, start: Instant::now(), status: None }
    }

    /// Keeps the first status seen.
    fn observe(&mut self, status: StatusCode) {
        self.status.get_or_insert(status);
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let status = self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.metrics
            .record(self.route, self.method.as_str(), &status_text(status), elapsed);
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use tower::{service_fn, ServiceExt};

    use super::*;

    fn request(method: Method) -> Request<String> {
        Request::builder()
            .method(method)
            .uri("/events")
            .body(String::new())
            .unwrap()
    }

    #[test]
    fn status_text_uses_reason_phrase() {
        assert_eq!(status_text(StatusCode::OK), "OK");
        assert_eq!(status_text(StatusCode::CREATED), "Created");
        assert_eq!(status_text(StatusCode::BAD_REQUEST), "Bad Request");
        assert_eq!(status_text(StatusCode::from_u16(599).unwrap()), "599");
    }

    #[tokio::test]
    async fn implicit_status_is_recorded_as_ok() {
        let metrics = Arc::new(HttpMetrics::new());
        let svc = InstrumentLayer::new("/events", Arc::clone(&metrics)).layer(service_fn(
            |_req: Request<String>| async { Ok::<_, Infallible>(Response::new("[]".to_string())) },
        ));

        let res = svc.oneshot(request(Method::GET)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            metrics.requests.get(&[("route", "/events"), ("method", "GET"), ("code", "OK")]),
            1
        );
        assert_eq!(metrics.duration.count(&[("route", "/events"), ("method", "GET")]), 1);
    }

    #[tokio::test]
    async fn response_passes_through_unchanged() {
        let metrics = Arc::new(HttpMetrics::new());
        let svc = InstrumentLayer::new("/events", Arc::clone(&metrics)).layer(service_fn(
            |_req: Request<String>| async {
                let res = Response::builder()
                    .status(StatusCode::CREATED)
                    .header("x-test", "1")
                    .body("body".to_string())
                    .unwrap();
                Ok::<_, Infallible>(res)
            },
        ));

        let res = svc.oneshot(request(Method::POST)).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()["x-test"], "1");
        assert_eq!(res.body(), "body");
        assert_eq!(
            metrics.requests.get(&[("route", "/events"), ("method", "POST"), ("code", "Created")]),
            1
        );
    }

    #[tokio::test]
    async fn abandoned_request_counts_as_server_error() {
        let metrics = Arc::new(HttpMetrics::new());
        let mut svc = InstrumentLayer::new("/events", Arc::clone(&metrics)).layer(service_fn(
            |_req: Request<String>| async {
                std::future::pending::<()>().await;
                Ok::<_, Infallible>(Response::new(String::new()))
            },
        ));

        let fut = ServiceExt::<Request<String>>::ready(&mut svc)
            .await
            .unwrap()
            .call(request(Method::GET));
        drop(fut);

        assert_eq!(
            metrics.requests.get(&[
                ("route", "/events"),
                ("method", "GET"),
                ("code", "Internal Server Error")
            ]),
            1
        );
        assert_eq!(metrics.requests_for("/events", "GET"), 1);
    }
}
