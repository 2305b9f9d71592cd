//! Shared application state.
//!
//! Holds the event store and the instrumentation context. Both are created
//! once in `main` and live for the process lifetime.

use std::sync::Arc;

use eventsink_core::EventStore;

use crate::config::GatewayConfig;
use crate::obs::HttpMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<HttpMetrics>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    store: Arc<EventStore>,
}

impl AppState {
    pub fn new(cfg: GatewayConfig, store: Arc<EventStore>, metrics: Arc<HttpMetrics>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { cfg, store }),
            metrics,
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn store(&self) -> &EventStore {
        &self.inner.store
    }

    pub fn metrics(&self) -> Arc<HttpMetrics> {
        Arc::clone(&self.metrics)
    }
}
