//! Status transition engine
//!
//! A transition is a status write plus the stock reconciliation it implies.
//! Crossing from a stock-holding status to a released one credits the units
//! back; crossing the other way re-debits them through the same guarded
//! update used at creation, so a re-reserve can fail with insufficient stock
//! and leave the order untouched.

use shared::error::{AppError, ErrorCode};
use shared::models::{OrderId, OrderStatus, StockPhase};

use crate::db;
use crate::db::products::StockTarget;
use crate::error::ServiceResult;
use crate::state::AppState;

/// Inventory effect of a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAction {
    /// Both statuses are in the same stock phase
    None,
    /// Held -> Released: credit the order's quantity back
    Restock,
    /// Released -> Held: debit the order's quantity again
    Reserve,
}

/// Stock effect of moving an order from one status to another
pub fn stock_action(from: OrderStatus, to: OrderStatus) -> StockAction {
    match (from.stock_phase(), to.stock_phase()) {
        (StockPhase::Held, StockPhase::Released) => StockAction::Restock,
        (StockPhase::Released, StockPhase::Held) => StockAction::Reserve,
        _ => StockAction::None,
    }
}

/// Result of a committed (or no-op) transition
#[derive(Debug, Clone, Copy)]
pub struct TransitionOutcome {
    pub id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub quantity: i32,
}

impl TransitionOutcome {
    /// Whether the call changed anything
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Move an order to `to`, reconciling stock in the same transaction
pub async fn transition(
    state: &AppState,
    id: OrderId,
    to: OrderStatus,
) -> Result<TransitionOutcome, AppError> {
    match tokio::time::timeout(state.tx_timeout, transition_tx(state, id, to)).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => {
            tracing::warn!(order_id = %id, "Status transition exceeded its deadline");
            Err(AppError::new(ErrorCode::InternalError))
        }
    }
}

async fn transition_tx(
    state: &AppState,
    id: OrderId,
    to: OrderStatus,
) -> ServiceResult<TransitionOutcome> {
    let mut tx = state.pool.begin().await?;

    // The row lock pins the current status; a concurrent transition waits
    // here and then sees ours as `from`.
    let row = db::orders::lock_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    let from = OrderStatus::try_from(row.status)?;

    let outcome = TransitionOutcome {
        id,
        from,
        to,
        quantity: row.quantity,
    };
    if from == to {
        // Repeated request for the current status; nothing to reconcile
        return Ok(outcome);
    }

    let target = match row.variation_id {
        Some(variation_id) => StockTarget::Variation {
            product_id: row.product_id,
            variation_id,
        },
        None => StockTarget::Product(row.product_id),
    };
    match stock_action(from, to) {
        StockAction::None => {}
        StockAction::Restock => {
            db::products::adjust_stock(&mut tx, &target, row.quantity).await?;
        }
        StockAction::Reserve => {
            db::products::adjust_stock(&mut tx, &target, -row.quantity).await?;
        }
    }

    db::orders::set_status(&mut tx, id, to).await?;
    tx.commit().await?;

    tracing::info!(order_id = %id, from = %from, to = %to, "Order status changed");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_held_to_released_restocks() {
        for from in [PendingPayment, Completed] {
            for to in [CancelledByUser, CancelledByAdmin, Rejected, Removed] {
                assert_eq!(stock_action(from, to), StockAction::Restock);
            }
        }
    }

    #[test]
    fn test_released_to_held_reserves() {
        for from in [CancelledByUser, CancelledByAdmin, Rejected, Removed] {
            for to in [PendingPayment, Completed] {
                assert_eq!(stock_action(from, to), StockAction::Reserve);
            }
        }
    }

    #[test]
    fn test_same_phase_moves_are_neutral() {
        assert_eq!(stock_action(PendingPayment, Completed), StockAction::None);
        assert_eq!(stock_action(Completed, PendingPayment), StockAction::None);
        assert_eq!(stock_action(Rejected, Removed), StockAction::None);
        assert_eq!(
            stock_action(CancelledByUser, CancelledByAdmin),
            StockAction::None
        );
    }

    #[test]
    fn test_round_trip_is_balanced() {
        // A cancel followed by a reinstate must net to zero stock movement
        assert_eq!(stock_action(PendingPayment, Rejected), StockAction::Restock);
        assert_eq!(stock_action(Rejected, PendingPayment), StockAction::Reserve);
    }

    #[test]
    fn test_outcome_changed() {
        let id = OrderId::registered(1);
        let noop = TransitionOutcome {
            id,
            from: Completed,
            to: Completed,
            quantity: 1,
        };
        assert!(!noop.changed());
        let real = TransitionOutcome {
            id,
            from: PendingPayment,
            to: Completed,
            quantity: 1,
        };
        assert!(real.changed());
    }
}
