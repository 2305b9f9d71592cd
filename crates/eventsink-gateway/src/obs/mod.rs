//! Request observability: in-process metrics registry and the per-endpoint
//! instrumentation wrapper that feeds it.
//!
//! Metrics are stored as atomics in `DashMap`s and rendered by the `/metrics`
//! handler in Prometheus text format.

pub mod instrument;
pub mod metrics;

pub use instrument::{status_text, InstrumentLayer, Instrumented};
pub use metrics::HttpMetrics;
