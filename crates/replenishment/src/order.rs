use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kitroom_core::{DomainError, DomainResult, Entity, ItemCode, OrderId};
use kitroom_ledger::validate_movement_quantity;

/// Supplier order status lifecycle.
///
/// Transitions are monotone: `Placed` → `Fulfilled` or `Placed` →
/// `Cancelled`; both end states are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Placed,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(OrderStatus::Placed),
            "fulfilled" => Ok(OrderStatus::Fulfilled),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown order status: {other:?}"
            ))),
        }
    }
}

/// Outcome of a state-machine step on an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The status changed; side effects (stock) must be applied.
    Applied,
    /// The order was already in the requested terminal state; no-op.
    AlreadyInState,
}

/// One supplier order for a single item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    id: OrderId,
    item_code: ItemCode,
    quantity: i64,
    ordered_at: DateTime<Utc>,
    status: OrderStatus,
    supplier: Option<String>,
    note: Option<String>,
}

impl Order {
    /// Create a new order in the `Placed` state.
    pub fn place(
        id: OrderId,
        item_code: ItemCode,
        quantity: i64,
        supplier: Option<String>,
        note: Option<String>,
        ordered_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        validate_movement_quantity(quantity)?;
        Ok(Self {
            id,
            item_code,
            quantity,
            ordered_at,
            status: OrderStatus::Placed,
            supplier: supplier.filter(|s| !s.trim().is_empty()),
            note: note.filter(|s| !s.trim().is_empty()),
        })
    }

    /// Rebuild an order from stored fields. No validation; storage is trusted
    /// to only hold rows created through [`Order::place`].
    pub fn from_parts(
        id: OrderId,
        item_code: ItemCode,
        quantity: i64,
        ordered_at: DateTime<Utc>,
        status: OrderStatus,
        supplier: Option<String>,
        note: Option<String>,
    ) -> Self {
        Self {
            id,
            item_code,
            quantity,
            ordered_at,
            status,
            supplier,
            note,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn item_code(&self) -> ItemCode {
        self.item_code
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn ordered_at(&self) -> DateTime<Utc> {
        self.ordered_at
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn supplier(&self) -> Option<&str> {
        self.supplier.as_deref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Move the order to `Fulfilled`.
    ///
    /// Idempotent when already fulfilled (the caller must then skip the stock
    /// increment); a cancelled order can never be fulfilled.
    pub fn fulfill(&mut self) -> DomainResult<Transition> {
        match self.status {
            OrderStatus::Fulfilled => Ok(Transition::AlreadyInState),
            OrderStatus::Cancelled => Err(DomainError::invalid_state(
                "cancelled order cannot be fulfilled",
            )),
            OrderStatus::Placed => {
                self.status = OrderStatus::Fulfilled;
                Ok(Transition::Applied)
            }
        }
    }

    /// Move the order to `Cancelled`. Idempotent when already cancelled; a
    /// fulfilled order can never be cancelled.
    pub fn cancel(&mut self) -> DomainResult<Transition> {
        match self.status {
            OrderStatus::Cancelled => Ok(Transition::AlreadyInState),
            OrderStatus::Fulfilled => Err(DomainError::invalid_state(
                "fulfilled order cannot be cancelled",
            )),
            OrderStatus::Placed => {
                self.status = OrderStatus::Cancelled;
                Ok(Transition::Applied)
            }
        }
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
