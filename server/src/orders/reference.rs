//! Order reference generation
//!
//! References are human-facing: a configured prefix, the creation date, and
//! a zero-padded daily sequence number (`ORD20250829001`). The sequence is
//! derived from the day's order count inside the creation transaction, after
//! the product row lock is held, so two concurrent creations for the same
//! product cannot observe the same count.

use chrono::{NaiveDate, Utc};
use sqlx::PgTransaction;

use crate::db;

/// Render a reference from its parts. Sequence padding is three digits;
/// larger sequences widen rather than truncate.
pub fn format_reference(prefix: &str, date: NaiveDate, seq: i64) -> String {
    format!("{prefix}{}{seq:03}", date.format("%Y%m%d"))
}

/// Next reference for an order created now, on the open creation transaction
pub async fn next_reference(
    tx: &mut PgTransaction<'_>,
    prefix: &str,
) -> Result<String, sqlx::Error> {
    let today = Utc::now().date_naive();
    let count = db::orders::count_created_on(tx, today).await?;
    Ok(format_reference(prefix, today, count + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_pads_sequence() {
        assert_eq!(format_reference("ORD", date(2025, 3, 1), 1), "ORD20250301001");
        assert_eq!(format_reference("ORD", date(2025, 3, 1), 42), "ORD20250301042");
        assert_eq!(
            format_reference("ORD", date(2025, 12, 31), 999),
            "ORD20251231999"
        );
    }

    #[test]
    fn test_format_widens_past_three_digits() {
        assert_eq!(
            format_reference("ORD", date(2025, 3, 1), 1000),
            "ORD202503011000"
        );
    }

    #[test]
    fn test_format_uses_prefix_verbatim() {
        assert_eq!(format_reference("CSPS", date(2024, 1, 9), 7), "CSPS20240109007");
        assert_eq!(format_reference("", date(2024, 1, 9), 7), "20240109007");
    }
}
