use chrono::{DateTime, Utc};
use serde::Serialize;

use kitroom_core::{DomainError, DomainResult, EmployeeId, Entity, ItemCode, MovementId};
use kitroom_ledger::{Grade, validate_movement_quantity};

/// Minimum length of the issue reason, after trimming.
pub const MIN_REASON_LEN: usize = 3;

/// One issue-and-optional-return cycle of an item quantity.
///
/// Lifecycle: `Issued` (return fields null) → `Returned` (return fields set).
/// A returned movement is terminal; it can never be returned again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movement {
    id: MovementId,
    employee_id: EmployeeId,
    item_code: ItemCode,
    quantity: i64,
    reason: String,
    issued_at: DateTime<Utc>,
    returned_at: Option<DateTime<Utc>>,
    returned_grade: Option<Grade>,
}

impl Movement {
    /// Create a freshly issued movement after validating reason and quantity.
    pub fn issue(
        id: MovementId,
        employee_id: EmployeeId,
        item_code: ItemCode,
        quantity: i64,
        reason: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        validate_movement_quantity(quantity)?;
        let reason = validate_reason(reason.into())?;
        Ok(Self {
            id,
            employee_id,
            item_code,
            quantity,
            reason,
            issued_at,
            returned_at: None,
            returned_grade: None,
        })
    }

    /// Rebuild a movement from stored fields. No validation; storage is
    /// trusted to only hold rows created through [`Movement::issue`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: MovementId,
        employee_id: EmployeeId,
        item_code: ItemCode,
        quantity: i64,
        reason: String,
        issued_at: DateTime<Utc>,
        returned_at: Option<DateTime<Utc>>,
        returned_grade: Option<Grade>,
    ) -> Self {
        Self {
            id,
            employee_id,
            item_code,
            quantity,
            reason,
            issued_at,
            returned_at,
            returned_grade,
        }
    }

    pub fn id_typed(&self) -> MovementId {
        self.id
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    pub fn item_code(&self) -> ItemCode {
        self.item_code
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }

    pub fn returned_grade(&self) -> Option<Grade> {
        self.returned_grade
    }

    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }

    /// Record the return of this movement at the assessed grade.
    ///
    /// Fails with `InvalidState` when already returned; callers that want the
    /// at-most-once idempotent behavior check [`Movement::is_returned`] first
    /// and return the record unchanged instead of calling this.
    pub fn close(&mut self, grade: Grade, returned_at: DateTime<Utc>) -> DomainResult<()> {
        if self.is_returned() {
            return Err(DomainError::invalid_state("movement already returned"));
        }
        self.returned_at = Some(returned_at);
        self.returned_grade = Some(grade);
        Ok(())
    }

    /// Correct the recorded return grade, yielding the grade it replaces.
    ///
    /// Only meaningful for returned movements; the caller must move the
    /// returned quantity between the two grade buckets in the same
    /// transaction that persists this change.
    pub fn change_returned_grade(&mut self, new_grade: Grade) -> DomainResult<Grade> {
        let old = self
            .returned_grade
            .ok_or_else(|| DomainError::invalid_state("movement has not been returned"))?;
        self.returned_grade = Some(new_grade);
        Ok(old)
    }
}

impl Entity for Movement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Trim and validate an issue reason.
pub fn validate_reason(reason: String) -> DomainResult<String> {
    let trimmed = reason.trim();
    if trimmed.chars().count() < MIN_REASON_LEN {
        return Err(DomainError::validation(format!(
            "reason must be at least {MIN_REASON_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_movement() -> Movement {
        Movement::issue(
            MovementId::new(),
            EmployeeId::new(),
            ItemCode::new(1_000_000).unwrap(),
            2,
            "winter rotation",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn issue_rejects_short_reasons() {
        let err = Movement::issue(
            MovementId::new(),
            EmployeeId::new(),
            ItemCode::new(1_000_000).unwrap(),
            1,
            "  ok  ",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn issue_rejects_non_positive_quantities() {
        let err = Movement::issue(
            MovementId::new(),
            EmployeeId::new(),
            ItemCode::new(1_000_000).unwrap(),
            0,
            "winter rotation",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn reason_is_stored_trimmed() {
        let movement = Movement::issue(
            MovementId::new(),
            EmployeeId::new(),
            ItemCode::new(1_000_000).unwrap(),
            1,
            "  torn sleeve  ",
            Utc::now(),
        )
        .unwrap();
        assert_eq!(movement.reason(), "torn sleeve");
    }

    #[test]
    fn close_sets_return_fields_exactly_once() {
        let mut movement = test_movement();
        assert!(!movement.is_returned());

        movement.close(Grade::Good, Utc::now()).unwrap();
        assert!(movement.is_returned());
        assert_eq!(movement.returned_grade(), Some(Grade::Good));

        let err = movement.close(Grade::Damaged, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        // First return stays in place.
        assert_eq!(movement.returned_grade(), Some(Grade::Good));
    }

    #[test]
    fn grade_correction_requires_a_returned_movement() {
        let mut movement = test_movement();
        let err = movement.change_returned_grade(Grade::Used).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));

        movement.close(Grade::Good, Utc::now()).unwrap();
        let old = movement.change_returned_grade(Grade::Used).unwrap();
        assert_eq!(old, Grade::Good);
        assert_eq!(movement.returned_grade(), Some(Grade::Used));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: reason validation accepts exactly the trimmed inputs
            /// of at least the minimum length.
            #[test]
            fn reason_validation_matches_trimmed_length(reason in "[ a-z]{0,12}") {
                let expected_ok = reason.trim().chars().count() >= MIN_REASON_LEN;
                prop_assert_eq!(validate_reason(reason).is_ok(), expected_ok);
            }
        }
    }
}
