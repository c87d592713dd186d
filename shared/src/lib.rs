//! Shared types for the merch store backend
//!
//! Domain models (orders, products, buyers), the unified error surface
//! (`AppError` / `ErrorCode` / `ApiResponse`), and small utilities used by
//! the server crate.

pub mod error;
pub mod models;
pub mod util;
