//! Replenishment domain module.
//!
//! A supplier [`Order`] adds quantity back into an item's "new" bucket when
//! fulfilled. Pure domain logic; the persistence layer pairs the fulfillment
//! transition with the stock increment inside one transaction.

pub mod order;

pub use order::{Order, OrderStatus, Transition};
