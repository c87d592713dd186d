//! Proof-of-payment asset storage

use shared::models::PaymentProof;
use sqlx::{PgPool, PgTransaction};

/// Uploaded proof before it is tied to a reference
#[derive(Debug, Clone)]
pub struct ProofUpload {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Insert a proof inside the order-creation transaction, keyed by reference
pub async fn insert(
    tx: &mut PgTransaction<'_>,
    reference: &str,
    proof: &ProofUpload,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO payment_proofs (reference, name, mime_type, data)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(reference)
    .bind(&proof.name)
    .bind(&proof.mime_type)
    .bind(&proof.data)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Fetch a proof by order reference (receipt rendering)
pub async fn find_by_reference(
    pool: &PgPool,
    reference: &str,
) -> Result<Option<PaymentProof>, sqlx::Error> {
    let row: Option<(String, String, String, Vec<u8>)> = sqlx::query_as(
        "SELECT reference, name, mime_type, data
         FROM payment_proofs WHERE reference = $1
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(reference)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(reference, name, mime_type, data)| PaymentProof {
        reference,
        name,
        mime_type,
        data,
    }))
}
