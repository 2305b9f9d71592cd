//! eventsink gateway library entry.
//!
//! Wires the event store, request pipeline, instrumentation, and lifecycle
//! into an HTTP service. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod lifecycle;
pub mod obs;
pub mod ops;
pub mod pipeline;
pub mod router;
