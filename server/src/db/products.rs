//! Product and stock database operations
//!
//! The stock ledger lives here: `adjust_stock` is the single guarded
//! statement every debit and credit goes through. It only runs inside an
//! open transaction, so concurrent writers serialize on the row lock.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use sqlx::PgTransaction;

use crate::error::ServiceResult;

/// Product row as read (and locked) by the order engine
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub max_quantity: i32,
    pub is_available: bool,
}

/// Variation row as read (and locked) by the order engine
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VariationRow {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub stock: i32,
}

/// Target of a stock adjustment: a product or a specific variation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockTarget {
    Product(i64),
    Variation { product_id: i64, variation_id: i64 },
}

/// Fetch a product row with a row lock held until the transaction ends
pub async fn lock_product(
    tx: &mut PgTransaction<'_>,
    product_id: i64,
) -> Result<Option<ProductRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, name, price, stock, max_quantity, is_available
         FROM products WHERE id = $1 FOR UPDATE",
    )
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Fetch a variation row (scoped to its product) with a row lock
pub async fn lock_variation(
    tx: &mut PgTransaction<'_>,
    product_id: i64,
    variation_id: i64,
) -> Result<Option<VariationRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, product_id, name, stock
         FROM product_variations WHERE id = $1 AND product_id = $2 FOR UPDATE",
    )
    .bind(variation_id)
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Apply `stock = stock + delta` as a single guarded statement.
///
/// The `stock + delta >= 0` predicate makes the insufficient-stock check
/// atomic with the write: zero rows affected on an existing target means the
/// debit would have gone negative.
pub async fn adjust_stock(
    tx: &mut PgTransaction<'_>,
    target: &StockTarget,
    delta: i32,
) -> ServiceResult<()> {
    let affected = match target {
        StockTarget::Product(id) => {
            sqlx::query("UPDATE products SET stock = stock + $1 WHERE id = $2 AND stock + $1 >= 0")
                .bind(delta)
                .bind(id)
                .execute(&mut **tx)
                .await?
                .rows_affected()
        }
        StockTarget::Variation {
            product_id,
            variation_id,
        } => sqlx::query(
            "UPDATE product_variations SET stock = stock + $1
             WHERE id = $2 AND product_id = $3 AND stock + $1 >= 0",
        )
        .bind(delta)
        .bind(variation_id)
        .bind(product_id)
        .execute(&mut **tx)
        .await?
        .rows_affected(),
    };

    if affected > 0 {
        return Ok(());
    }

    // Distinguish insufficient stock from a missing row
    let exists: bool = match target {
        StockTarget::Product(id) => {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut **tx)
                .await?
        }
        StockTarget::Variation {
            product_id,
            variation_id,
        } => sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM product_variations WHERE id = $1 AND product_id = $2)",
        )
        .bind(variation_id)
        .bind(product_id)
        .fetch_one(&mut **tx)
        .await?,
    };

    if exists {
        Err(AppError::insufficient_stock().into())
    } else {
        let code = match target {
            StockTarget::Product(_) => ErrorCode::ProductNotFound,
            StockTarget::Variation { .. } => ErrorCode::VariationNotFound,
        };
        Err(AppError::new(code).into())
    }
}
