//! Order engine: creation, reference generation, status transitions
//!
//! Each engine operation owns exactly one database transaction and is bounded
//! by the configured transaction timeout; a timed-out future drops the
//! transaction, which rolls it back.

pub mod create;
pub mod reference;
pub mod status;

use std::str::FromStr;

use shared::error::{AppError, ErrorCode};
use shared::models::PaymentMode;

use crate::db::orders::FieldValue;

/// Order fields an admin may edit directly, outside the transition engine.
///
/// Everything else (status, quantity, buyer identity, product) is either
/// immutable or must go through its dedicated path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    UserRemarks,
    AdminRemarks,
    ModeOfPayment,
}

impl EditField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::UserRemarks => "user_remarks",
            Self::AdminRemarks => "admin_remarks",
            Self::ModeOfPayment => "mode_of_payment",
        }
    }

    /// Validate and type a raw request value for this field
    pub fn parse_value(&self, raw: &str) -> Result<FieldValue, AppError> {
        match self {
            Self::UserRemarks | Self::AdminRemarks => Ok(FieldValue::Text(raw.to_string())),
            Self::ModeOfPayment => {
                let n: i16 = raw.parse().map_err(|_| {
                    AppError::validation(format!("Unknown payment mode: {raw}"))
                })?;
                let mode = PaymentMode::try_from(n)?;
                Ok(FieldValue::Smallint(mode.as_i16()))
            }
        }
    }
}

impl FromStr for EditField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_remarks" => Ok(Self::UserRemarks),
            "admin_remarks" => Ok(Self::AdminRemarks),
            "mode_of_payment" => Ok(Self::ModeOfPayment),
            other => Err(AppError::with_message(
                ErrorCode::FieldNotEditable,
                format!("Field '{other}' is not editable"),
            )
            .with_detail("key", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_field_allow_list() {
        assert_eq!(
            "user_remarks".parse::<EditField>().unwrap(),
            EditField::UserRemarks
        );
        assert_eq!(
            "mode_of_payment".parse::<EditField>().unwrap().column(),
            "mode_of_payment"
        );
        for key in ["status", "quantity", "student_id", "reference", "id"] {
            let err = key.parse::<EditField>().unwrap_err();
            assert_eq!(err.code, ErrorCode::FieldNotEditable);
        }
    }

    #[test]
    fn test_payment_mode_value_is_validated() {
        let field = EditField::ModeOfPayment;
        assert!(matches!(
            field.parse_value("1").unwrap(),
            FieldValue::Smallint(1)
        ));
        assert!(field.parse_value("9").is_err());
        assert!(field.parse_value("cash").is_err());
    }

    #[test]
    fn test_remarks_pass_through_as_text() {
        let value = EditField::AdminRemarks.parse_value("paid at booth").unwrap();
        assert!(matches!(value, FieldValue::Text(text) if text == "paid at booth"));
    }
}
