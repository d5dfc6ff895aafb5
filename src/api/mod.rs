//! REST client for the feedback backend.

pub mod client;
pub mod error;
pub mod models;
#[cfg(test)]
pub(crate) mod stub;

pub use client::{ApiClient, ExportedReport};
pub use error::{ApiError, ApiResult};
