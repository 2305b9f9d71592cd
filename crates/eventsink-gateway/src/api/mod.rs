//! Event ingestion HTTP surface.

pub mod error;
pub mod events;

pub use error::ApiError;
