//! eventsink core: event model, in-memory store, and the shared error surface.
//!
//! This crate carries no transport or runtime dependencies. The gateway wires
//! it behind HTTP; tests drive it directly.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Fallible paths surface as `EventSinkError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod event;
pub mod store;

pub use error::{EventSinkError, Result};
pub use event::{NewEvent, StoredEvent};
pub use store::EventStore;
