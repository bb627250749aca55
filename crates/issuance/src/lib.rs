//! Issuance/return domain module.
//!
//! A [`Movement`] is one issue-then-optional-return lifecycle of a quantity
//! of an item handed to an employee. Pure domain logic; the persistence layer
//! pairs every lifecycle step with the matching stock mutation inside one
//! transaction.

pub mod movement;

pub use movement::{MIN_REASON_LEN, Movement, validate_reason};
