use serde::{Deserialize, Serialize};

use kitroom_core::{DomainError, DomainResult, ItemCode};

use crate::grade::Grade;

/// One (item, grade) quantity row of the stock ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBucket {
    pub item_code: ItemCode,
    pub grade: Grade,
    pub quantity: i64,
}

/// Validate the quantity of a single stock movement (must be >= 1).
pub fn validate_movement_quantity(quantity: i64) -> DomainResult<()> {
    if quantity < 1 {
        return Err(DomainError::validation(format!(
            "movement quantity must be at least 1, got {quantity}"
        )));
    }
    Ok(())
}

/// Compute the bucket quantity after removing `requested` units.
///
/// This is the non-negativity rule of the ledger: the caller must evaluate it
/// against the bucket value read *inside* its own transaction, immediately
/// before writing the result back.
pub fn checked_decrement(available: i64, requested: i64) -> DomainResult<i64> {
    validate_movement_quantity(requested)?;
    if available < requested {
        return Err(DomainError::insufficient_stock(requested, available));
    }
    Ok(available - requested)
}

/// Compute the bucket quantity after adding `amount` units.
pub fn checked_increment(current: i64, amount: i64) -> DomainResult<i64> {
    validate_movement_quantity(amount)?;
    current
        .checked_add(amount)
        .ok_or_else(|| DomainError::validation("bucket quantity overflow"))
}
