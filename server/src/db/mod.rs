//! Database access layer
//!
//! Multi-statement writes (order creation, status transitions) run on one
//! transaction passed down from the engine in `crate::orders`; read paths
//! take the pool directly.

pub mod orders;
pub mod products;
pub mod proofs;
pub mod query;
