//! Data models
//!
//! Shared between the server and its API consumers.
//! All row IDs are `i64` (PostgreSQL BIGSERIAL).

pub mod order;
pub mod product;

// Re-exports
pub use order::*;
pub use product::*;
