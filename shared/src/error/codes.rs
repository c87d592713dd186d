//! Unified error codes for the merch store backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 6xxx: Product / inventory errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Column or update key not in the allow-list
    KeyNotAllowed = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Proof of payment required for this payment mode
    ProofRequired = 4002,
    /// Unknown or disallowed order status value
    InvalidStatusKey = 4003,
    /// Order field is not administratively editable
    FieldNotEditable = 4004,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product variation not found
    VariationNotFound = 6002,
    /// Product is not available for ordering
    ProductUnavailable = 6003,
    /// Insufficient stock for the requested quantity
    InsufficientStock = 6004,
    /// Requested quantity exceeds the per-order maximum
    QuantityLimitExceeded = 6005,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default human-readable message for this code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::KeyNotAllowed => "Key is not allowed",
            Self::RequiredField => "Required field missing",
            Self::ValueOutOfRange => "Value out of range",

            Self::OrderNotFound => "Order not found",
            Self::ProofRequired => "Proof of payment is required",
            Self::InvalidStatusKey => "Unknown order status",
            Self::FieldNotEditable => "Order field is not editable",

            Self::ProductNotFound => "Product not found",
            Self::VariationNotFound => "Product variation not found",
            Self::ProductUnavailable => "Product is currently unavailable",
            Self::InsufficientStock => "Insufficient stock",
            Self::QuantityLimitExceeded => "Quantity exceeds the per-order limit",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Self::Success => StatusCode::OK,
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::KeyNotAllowed
            | Self::RequiredField
            | Self::ValueOutOfRange
            | Self::ProofRequired
            | Self::InvalidStatusKey
            | Self::FieldNotEditable => StatusCode::BAD_REQUEST,
            Self::NotFound
            | Self::OrderNotFound
            | Self::ProductNotFound
            | Self::VariationNotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::ProductUnavailable
            | Self::InsufficientStock
            | Self::QuantityLimitExceeded => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unknown | Self::InternalError | Self::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,
            6 => Self::KeyNotAllowed,
            7 => Self::RequiredField,
            8 => Self::ValueOutOfRange,
            4001 => Self::OrderNotFound,
            4002 => Self::ProofRequired,
            4003 => Self::InvalidStatusKey,
            4004 => Self::FieldNotEditable,
            6001 => Self::ProductNotFound,
            6002 => Self::VariationNotFound,
            6003 => Self::ProductUnavailable,
            6004 => Self::InsufficientStock,
            6005 => Self::QuantityLimitExceeded,
            9001 => Self::InternalError,
            9002 => Self::DatabaseError,
            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::ValidationFailed,
            ErrorCode::OrderNotFound,
            ErrorCode::ProofRequired,
            ErrorCode::InsufficientStock,
            ErrorCode::InternalError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_invalid_code() {
        assert_eq!(ErrorCode::try_from(1234), Err(InvalidErrorCode(1234)));
    }

    #[test]
    fn test_http_status() {
        use http::StatusCode;
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::ProofRequired.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::InsufficientStock.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::ValidationFailed.to_string(), "E0002");
        assert_eq!(ErrorCode::InsufficientStock.to_string(), "E6004");
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&ErrorCode::OrderNotFound).unwrap();
        assert_eq!(json, "4001");
        let code: ErrorCode = serde_json::from_str("6004").unwrap();
        assert_eq!(code, ErrorCode::InsufficientStock);
    }
}
