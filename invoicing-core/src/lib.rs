//! invoicing-core: Shared infrastructure for the invoicing backend.
pub mod error;
pub mod middleware;
pub mod observability;
pub mod validation;

pub use axum;
pub use mongodb;
pub use serde;
pub use serde_json;
pub use tracing;
pub use validator;
