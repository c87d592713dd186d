//! Product model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity
///
/// `stock` is the product-level counter, used when the product has no
/// variations. `max_quantity` caps a single order; 0 means uncapped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub max_quantity: i32,
    pub is_available: bool,
}

/// Product variation (size, color, ...) with its own independent stock count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariation {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub stock: i32,
}

/// Proof-of-payment asset stored alongside an order, keyed by its reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProof {
    pub reference: String,
    pub name: String,
    pub mime_type: String,
    #[serde(with = "crate::util::base64_bytes")]
    pub data: Vec<u8>,
}
