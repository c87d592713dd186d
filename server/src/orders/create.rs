//! Order creation
//!
//! Validation happens before any database work; the write path is one
//! transaction that locks the product (and variation) rows, derives the
//! reference, inserts the order and its proof, and debits stock last so the
//! guarded update is the final arbiter under concurrency.

use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Buyer, GuestIdentity, OrderId, OrderView, PaymentMode};
use sqlx::PgTransaction;

use crate::db;
use crate::db::products::StockTarget;
use crate::db::proofs::ProofUpload;
use crate::error::{ServiceError, ServiceResult};
use crate::state::AppState;

/// Raw creation payload; everything optional so validation can name the
/// missing field instead of failing deserialization wholesale
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub product_id: Option<i64>,
    pub variation_id: Option<i64>,
    pub quantity: Option<i32>,
    pub mode_of_payment: Option<i16>,
    #[serde(default)]
    pub user_remarks: Option<String>,
    /// Inline identity for buyers without an account
    pub guest: Option<GuestPayload>,
    pub proof: Option<ProofPayload>,
}

/// Raw guest identity; every field optional so a missing one surfaces as a
/// named validation error instead of a deserialization failure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuestPayload {
    pub student_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub course: Option<i32>,
    pub year_level: Option<i32>,
}

/// Proof-of-payment upload, image bytes base64-encoded on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct ProofPayload {
    pub name: String,
    pub mime_type: String,
    #[serde(with = "shared::util::base64_bytes")]
    pub data: Vec<u8>,
}

/// A validated order, ready for the write path
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub buyer: Buyer,
    pub product_id: i64,
    pub variation_id: Option<i64>,
    pub quantity: i32,
    pub mode_of_payment: PaymentMode,
    pub user_remarks: String,
    pub proof: Option<ProofUpload>,
}

/// Validate a raw request into a [`NewOrder`].
///
/// `student_id` is the authenticated buyer, if any; without one the request
/// must carry a complete guest identity.
pub fn validate(req: CreateOrderRequest, student_id: Option<String>) -> Result<NewOrder, AppError> {
    let product_id = req.product_id.ok_or_else(|| AppError::missing_field("product_id"))?;

    let mode = req
        .mode_of_payment
        .ok_or_else(|| AppError::missing_field("mode_of_payment"))?;
    let mode_of_payment = PaymentMode::try_from(mode)?;

    let quantity = req.quantity.ok_or_else(|| AppError::missing_field("quantity"))?;
    if quantity <= 0 {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            "quantity must be greater than zero",
        )
        .with_detail("field", "quantity"));
    }

    let proof = match req.proof {
        Some(proof) => {
            if proof.data.is_empty() {
                return Err(AppError::validation("proof is empty").with_detail("field", "proof"));
            }
            Some(ProofUpload {
                name: proof.name,
                mime_type: proof.mime_type,
                data: proof.data,
            })
        }
        None => None,
    };
    if mode_of_payment.requires_proof() && proof.is_none() {
        return Err(AppError::proof_required());
    }

    let buyer = match student_id {
        Some(student_id) => Buyer::Registered { student_id },
        None => {
            let guest = req.guest.ok_or_else(|| AppError::missing_field("guest"))?;
            Buyer::Guest(validate_guest(guest)?)
        }
    };

    Ok(NewOrder {
        buyer,
        product_id,
        variation_id: req.variation_id,
        quantity,
        mode_of_payment,
        user_remarks: req.user_remarks.unwrap_or_default(),
        proof,
    })
}

fn required_text(field: &str, value: Option<String>) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::missing_field(field)),
    }
}

fn required_positive(field: &str, value: Option<i32>) -> Result<i32, AppError> {
    match value {
        Some(v) if v > 0 => Ok(v),
        _ => Err(AppError::missing_field(field)),
    }
}

/// Every guest field is required; course and year must be positive
fn validate_guest(guest: GuestPayload) -> Result<GuestIdentity, AppError> {
    Ok(GuestIdentity {
        student_number: required_text("guest.student_number", guest.student_number)?,
        first_name: required_text("guest.first_name", guest.first_name)?,
        last_name: required_text("guest.last_name", guest.last_name)?,
        email: required_text("guest.email", guest.email)?,
        course: required_positive("guest.course", guest.course)?,
        year_level: required_positive("guest.year_level", guest.year_level)?,
    })
}

/// Create an order atomically; returns the resolved view of the new order
pub async fn create_order(state: &AppState, order: NewOrder) -> Result<OrderView, AppError> {
    match tokio::time::timeout(state.tx_timeout, create_order_tx(state, order)).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => {
            tracing::warn!("Order creation transaction exceeded its deadline");
            Err(AppError::new(ErrorCode::InternalError))
        }
    }
}

async fn create_order_tx(state: &AppState, order: NewOrder) -> ServiceResult<OrderView> {
    let mut tx = state.pool.begin().await?;

    let target = check_product(&mut tx, &order).await?;

    let reference = super::reference::next_reference(&mut tx, &state.reference_prefix).await?;
    let public_id = shared::util::generate_token(20);

    let insert = db::orders::OrderInsert {
        reference: &reference,
        public_id: &public_id,
        product_id: order.product_id,
        variation_id: order.variation_id,
        quantity: order.quantity,
        mode_of_payment: order.mode_of_payment,
        user_remarks: &order.user_remarks,
    };
    let id = match &order.buyer {
        Buyer::Registered { student_id } => {
            let row_id = db::orders::insert_registered(&mut tx, &insert, student_id).await?;
            OrderId::registered(row_id)
        }
        Buyer::Guest(guest) => {
            let row_id = db::orders::insert_guest(&mut tx, &insert, guest).await?;
            OrderId::guest(row_id)
        }
    };

    if order.mode_of_payment.requires_proof() {
        // validate() guarantees the proof is present for proof-bearing modes
        let proof = order
            .proof
            .as_ref()
            .ok_or_else(AppError::proof_required)?;
        db::proofs::insert(&mut tx, &reference, proof).await?;
    }

    db::products::adjust_stock(&mut tx, &target, -order.quantity).await?;

    tx.commit().await?;

    tracing::info!(order_id = %id, %reference, "Order created");

    db::orders::find_view_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| missing_after_commit(id))
}

/// The order committed and stock was debited; a failed readback is an
/// infrastructure problem, never a not-found for the caller
fn missing_after_commit(id: OrderId) -> ServiceError {
    tracing::error!(order_id = %id, "Committed order missing on readback");
    ServiceError::App(AppError::new(ErrorCode::InternalError))
}

/// Lock and vet the product (and variation) rows; returns the stock target
async fn check_product(
    tx: &mut PgTransaction<'_>,
    order: &NewOrder,
) -> ServiceResult<StockTarget> {
    let product = db::products::lock_product(tx, order.product_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    if !product.is_available {
        return Err(AppError::new(ErrorCode::ProductUnavailable).into());
    }
    if product.max_quantity > 0 && order.quantity > product.max_quantity {
        return Err(AppError::new(ErrorCode::QuantityLimitExceeded)
            .with_detail("max_quantity", product.max_quantity)
            .into());
    }

    match order.variation_id {
        Some(variation_id) => {
            db::products::lock_variation(tx, order.product_id, variation_id)
                .await?
                .ok_or_else(|| AppError::new(ErrorCode::VariationNotFound))?;
            Ok(StockTarget::Variation {
                product_id: order.product_id,
                variation_id,
            })
        }
        None => Ok(StockTarget::Product(order.product_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CreateOrderRequest {
        CreateOrderRequest {
            product_id: Some(9),
            variation_id: None,
            quantity: Some(2),
            mode_of_payment: Some(1),
            user_remarks: None,
            guest: None,
            proof: None,
        }
    }

    fn guest() -> GuestPayload {
        GuestPayload {
            student_number: Some("2021-00123".into()),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            email: Some("ada@example.com".into()),
            course: Some(2),
            year_level: Some(3),
        }
    }

    #[test]
    fn test_registered_order_validates() {
        let order = validate(base_request(), Some("2021-00123".into())).unwrap();
        assert_eq!(
            order.buyer,
            Buyer::Registered {
                student_id: "2021-00123".into()
            }
        );
        assert_eq!(order.mode_of_payment, PaymentMode::WalkIn);
        assert_eq!(order.user_remarks, "");
    }

    #[test]
    fn test_missing_fields_are_named() {
        let mut req = base_request();
        req.product_id = None;
        let err = validate(req, Some("s".into())).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
        assert_eq!(err.details.unwrap().get("field").unwrap(), "product_id");

        let mut req = base_request();
        req.mode_of_payment = None;
        assert_eq!(
            validate(req, Some("s".into())).unwrap_err().code,
            ErrorCode::RequiredField
        );

        let mut req = base_request();
        req.quantity = None;
        assert_eq!(
            validate(req, Some("s".into())).unwrap_err().code,
            ErrorCode::RequiredField
        );
    }

    #[test]
    fn test_quantity_must_be_positive() {
        for quantity in [0, -1] {
            let mut req = base_request();
            req.quantity = Some(quantity);
            let err = validate(req, Some("s".into())).unwrap_err();
            assert_eq!(err.code, ErrorCode::ValueOutOfRange);
        }
    }

    #[test]
    fn test_unknown_payment_mode_rejected() {
        let mut req = base_request();
        req.mode_of_payment = Some(7);
        assert_eq!(
            validate(req, Some("s".into())).unwrap_err().code,
            ErrorCode::ValidationFailed
        );
    }

    #[test]
    fn test_ewallet_requires_proof() {
        let mut req = base_request();
        req.mode_of_payment = Some(2);
        let err = validate(req.clone(), Some("s".into())).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProofRequired);

        req.proof = Some(ProofPayload {
            name: "gcash.png".into(),
            mime_type: "image/png".into(),
            data: vec![0x89, 0x50, 0x4e, 0x47],
        });
        let order = validate(req, Some("s".into())).unwrap();
        assert!(order.proof.is_some());
    }

    #[test]
    fn test_walk_in_proof_is_kept_when_supplied() {
        let mut req = base_request();
        req.proof = Some(ProofPayload {
            name: "receipt.jpg".into(),
            mime_type: "image/jpeg".into(),
            data: vec![1, 2, 3],
        });
        let order = validate(req, Some("s".into())).unwrap();
        assert!(order.proof.is_some());
    }

    #[test]
    fn test_empty_proof_rejected() {
        let mut req = base_request();
        req.mode_of_payment = Some(2);
        req.proof = Some(ProofPayload {
            name: "empty.png".into(),
            mime_type: "image/png".into(),
            data: vec![],
        });
        assert_eq!(
            validate(req, Some("s".into())).unwrap_err().code,
            ErrorCode::ValidationFailed
        );
    }

    #[test]
    fn test_guest_identity_required_without_auth() {
        let err = validate(base_request(), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
        assert_eq!(err.details.unwrap().get("field").unwrap(), "guest");

        let mut req = base_request();
        req.guest = Some(guest());
        let order = validate(req, None).unwrap();
        assert!(matches!(order.buyer, Buyer::Guest(_)));
    }

    #[test]
    fn test_blank_guest_fields_rejected() {
        let mut incomplete = guest();
        incomplete.email = Some("   ".into());
        let mut req = base_request();
        req.guest = Some(incomplete);
        let err = validate(req, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
        assert_eq!(err.details.unwrap().get("field").unwrap(), "guest.email");
    }

    #[test]
    fn test_missing_guest_course_is_a_named_error() {
        // Sparse guest objects must deserialize and fail per-field, never
        // bounce at the JSON layer
        let req: CreateOrderRequest = serde_json::from_str(
            r#"{
                "product_id": 9,
                "quantity": 2,
                "mode_of_payment": 1,
                "guest": {
                    "student_number": "2021-00123",
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": "ada@example.com",
                    "year_level": 3
                }
            }"#,
        )
        .unwrap();
        let err = validate(req, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
        assert_eq!(err.details.unwrap().get("field").unwrap(), "guest.course");
    }

    #[test]
    fn test_zero_guest_course_and_year_rejected() {
        let mut g = guest();
        g.course = Some(0);
        let mut req = base_request();
        req.guest = Some(g);
        let err = validate(req, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
        assert_eq!(err.details.unwrap().get("field").unwrap(), "guest.course");

        let mut g = guest();
        g.year_level = Some(0);
        let mut req = base_request();
        req.guest = Some(g);
        let err = validate(req, None).unwrap_err();
        assert_eq!(
            err.details.unwrap().get("field").unwrap(),
            "guest.year_level"
        );
    }

    #[test]
    fn test_complete_guest_builds_identity() {
        let mut req = base_request();
        req.guest = Some(guest());
        let order = validate(req, None).unwrap();
        match order.buyer {
            Buyer::Guest(identity) => {
                assert_eq!(identity.student_number, "2021-00123");
                assert_eq!(identity.course, 2);
                assert_eq!(identity.year_level, 3);
            }
            other => panic!("expected guest buyer, got {other:?}"),
        }
    }

    #[test]
    fn test_committed_order_readback_failure_is_internal() {
        let err: AppError = missing_after_commit(OrderId::registered(42)).into();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert_ne!(err.code, ErrorCode::OrderNotFound);
    }

    #[test]
    fn test_auth_wins_over_guest_payload() {
        let mut req = base_request();
        req.guest = Some(guest());
        let order = validate(req, Some("2022-00999".into())).unwrap();
        assert_eq!(
            order.buyer,
            Buyer::Registered {
                student_id: "2022-00999".into()
            }
        );
    }
}
