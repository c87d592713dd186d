//! Unified error system for the merch store backend
//!
//! - [`ErrorCode`]: standardized error codes for all failure classes
//! - [`ErrorCategory`]: classification of errors by domain
//! - [`AppError`]: rich error type with code, message, and details
//! - [`ApiResponse`]: unified API response envelope
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors (validation, not-found, disallowed keys)
//! - 4xxx: Order errors
//! - 6xxx: Product / inventory errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::validation("Quantity is required").with_detail("field", "quantity");
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, Some(ErrorCode::ValidationFailed.code()));
//! ```

mod category;
mod codes;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
