//! Survey Platform Shared Library
//!
//! This crate contains the pure domain of the survey client: models,
//! answer validation, review formatting and analytics aggregation. It is
//! used by the client crate and by the WASM bindings.

pub mod analytics;
pub mod errors;
pub mod models;
pub mod review;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use models::*;
pub use types::*;
