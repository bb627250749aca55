//! End-to-end flows through the transactional engines against an in-memory
//! database: issue/return lifecycles, batch returns, order fulfillment, and
//! the non-negativity invariant under concurrency.

use kitroom_catalog::ItemDraft;
use kitroom_core::{DomainError, EmployeeId, ItemCode, MovementId};
use kitroom_ledger::Grade;
use kitroom_store::{
    BatchReturnEntry, CatalogService, Db, IssuanceService, ReplenishmentService, StockService,
    StoreError,
};

struct Harness {
    catalog: CatalogService,
    issuance: IssuanceService,
    replenishment: ReplenishmentService,
    stock: StockService,
}

impl Harness {
    async fn new() -> Self {
        let db = Db::in_memory().await.expect("in-memory db");
        Self {
            catalog: CatalogService::new(db.clone()),
            issuance: IssuanceService::new(db.clone()),
            replenishment: ReplenishmentService::new(db.clone()),
            stock: StockService::new(db),
        }
    }

    async fn register_item(&self) -> ItemCode {
        let draft = ItemDraft::new("Jacket", "Navy", "XL").expect("valid draft");
        self.catalog.register(draft).await.expect("register").code()
    }

    /// Seed the item's "new" bucket by placing and fulfilling an order.
    async fn stock_up(&self, code: ItemCode, quantity: i64) {
        let order = self
            .replenishment
            .place(code, quantity, None, None, None)
            .await
            .expect("place");
        self.replenishment
            .fulfill(order.id_typed())
            .await
            .expect("fulfill");
    }

    async fn quantity(&self, code: ItemCode, grade: Grade) -> i64 {
        self.stock.quantity(code, grade).await.expect("quantity")
    }
}

fn assert_insufficient(err: StoreError) {
    match err.as_domain() {
        Some(DomainError::InsufficientStock { .. }) => {}
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_bucket_cannot_be_reserved_until_released_into() {
    let h = Harness::new().await;
    let code = h.register_item().await;
    let employee = EmployeeId::new();

    // Nothing on hand yet.
    let err = h
        .issuance
        .issue(employee, code, 1, "site induction", None)
        .await
        .unwrap_err();
    assert_insufficient(err);

    h.stock_up(code, 5).await;
    assert_eq!(h.quantity(code, Grade::New).await, 5);

    h.issuance
        .issue(employee, code, 5, "site induction", None)
        .await
        .expect("exact quantity issue");
    assert_eq!(h.quantity(code, Grade::New).await, 0);

    let err = h
        .issuance
        .issue(employee, code, 1, "site induction", None)
        .await
        .unwrap_err();
    assert_insufficient(err);
}

#[tokio::test]
async fn failed_issue_leaves_no_movement_and_no_stock_change() {
    let h = Harness::new().await;
    let code = h.register_item().await;
    h.stock_up(code, 3).await;

    let err = h
        .issuance
        .issue(EmployeeId::new(), code, 4, "winter rotation", None)
        .await
        .unwrap_err();
    assert_insufficient(err);

    assert_eq!(h.quantity(code, Grade::New).await, 3);
    assert!(h.issuance.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn issue_validates_item_reason_and_quantity_before_touching_stock() {
    let h = Harness::new().await;
    let code = h.register_item().await;
    h.stock_up(code, 10).await;
    let employee = EmployeeId::new();

    let unknown = ItemCode::new(9_999_999).unwrap();
    let err = h
        .issuance
        .issue(employee, unknown, 1, "winter rotation", None)
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::NotFound)));

    let err = h
        .issuance
        .issue(employee, code, 1, "no", None)
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::Validation(_))));

    let err = h
        .issuance
        .issue(employee, code, 0, "winter rotation", None)
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::Validation(_))));

    assert_eq!(h.quantity(code, Grade::New).await, 10);
    assert!(h.issuance.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn issue_then_return_moves_quantity_between_buckets() {
    let h = Harness::new().await;
    let code = h.register_item().await;
    h.stock_up(code, 10).await;

    let movement = h
        .issuance
        .issue(EmployeeId::new(), code, 4, "winter rotation", None)
        .await
        .expect("issue");
    assert_eq!(h.quantity(code, Grade::New).await, 6);

    let returned = h
        .issuance
        .mark_return(movement.id_typed(), Grade::Good, None)
        .await
        .expect("return");
    assert!(returned.is_returned());
    assert_eq!(returned.returned_grade(), Some(Grade::Good));

    assert_eq!(h.quantity(code, Grade::New).await, 6);
    assert_eq!(h.quantity(code, Grade::Good).await, 4);
    assert_eq!(h.quantity(code, Grade::Used).await, 0);
    assert_eq!(h.quantity(code, Grade::Damaged).await, 0);
}

#[tokio::test]
async fn second_return_is_a_no_op_even_with_a_different_grade() {
    let h = Harness::new().await;
    let code = h.register_item().await;
    h.stock_up(code, 5).await;

    let movement = h
        .issuance
        .issue(EmployeeId::new(), code, 2, "winter rotation", None)
        .await
        .expect("issue");

    let first = h
        .issuance
        .mark_return(movement.id_typed(), Grade::Good, None)
        .await
        .expect("first return");

    let second = h
        .issuance
        .mark_return(movement.id_typed(), Grade::Damaged, None)
        .await
        .expect("second return is idempotent");

    // The stored record comes back unchanged; only the first stock effect
    // exists.
    assert_eq!(second, first);
    assert_eq!(h.quantity(code, Grade::Good).await, 2);
    assert_eq!(h.quantity(code, Grade::Damaged).await, 0);
}

#[tokio::test]
async fn batch_return_is_all_or_nothing() {
    let h = Harness::new().await;
    let code = h.register_item().await;
    h.stock_up(code, 9).await;
    let employee = EmployeeId::new();

    let m1 = h
        .issuance
        .issue(employee, code, 1, "winter rotation", None)
        .await
        .unwrap();
    let m3 = h
        .issuance
        .issue(employee, code, 2, "winter rotation", None)
        .await
        .unwrap();
    assert_eq!(h.quantity(code, Grade::New).await, 6);

    let entries = vec![
        BatchReturnEntry {
            movement_id: m1.id_typed(),
            grade: Grade::Good,
        },
        BatchReturnEntry {
            movement_id: MovementId::new(), // never issued
            grade: Grade::Good,
        },
        BatchReturnEntry {
            movement_id: m3.id_typed(),
            grade: Grade::Used,
        },
    ];

    let err = h.issuance.mark_return_batch(&entries, None).await.unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::NotFound)));

    // Full rollback: no increments, first movement still open.
    assert_eq!(h.quantity(code, Grade::Good).await, 0);
    assert_eq!(h.quantity(code, Grade::Used).await, 0);
    let m1_after = h.issuance.get(m1.id_typed()).await.unwrap();
    assert!(!m1_after.is_returned());
}

#[tokio::test]
async fn batch_return_shares_one_timestamp_and_tolerates_returned_entries() {
    let h = Harness::new().await;
    let code = h.register_item().await;
    h.stock_up(code, 6).await;
    let employee = EmployeeId::new();

    let m1 = h
        .issuance
        .issue(employee, code, 1, "winter rotation", None)
        .await
        .unwrap();
    let m2 = h
        .issuance
        .issue(employee, code, 2, "winter rotation", None)
        .await
        .unwrap();

    // m1 already returned before the batch runs.
    h.issuance
        .mark_return(m1.id_typed(), Grade::Used, None)
        .await
        .unwrap();

    let entries = vec![
        BatchReturnEntry {
            movement_id: m1.id_typed(),
            grade: Grade::Damaged,
        },
        BatchReturnEntry {
            movement_id: m2.id_typed(),
            grade: Grade::Good,
        },
    ];
    let returned = h.issuance.mark_return_batch(&entries, None).await.unwrap();
    assert_eq!(returned.len(), 2);

    // The pre-returned entry kept its original grade and stock effect.
    assert_eq!(returned[0].returned_grade(), Some(Grade::Used));
    assert_eq!(h.quantity(code, Grade::Used).await, 1);
    assert_eq!(h.quantity(code, Grade::Damaged).await, 0);
    assert_eq!(h.quantity(code, Grade::Good).await, 2);
}

#[tokio::test]
async fn return_grade_correction_moves_stock_between_buckets() {
    let h = Harness::new().await;
    let code = h.register_item().await;
    h.stock_up(code, 5).await;

    let movement = h
        .issuance
        .issue(EmployeeId::new(), code, 3, "winter rotation", None)
        .await
        .unwrap();

    // Correcting an open movement is refused.
    let err = h
        .issuance
        .correct_return_grade(movement.id_typed(), Grade::Used)
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::InvalidState(_))));

    h.issuance
        .mark_return(movement.id_typed(), Grade::Good, None)
        .await
        .unwrap();

    // Seed the target bucket so the correction has to merge quantities.
    let other = h
        .issuance
        .issue(EmployeeId::new(), code, 1, "spare set", None)
        .await
        .unwrap();
    h.issuance
        .mark_return(other.id_typed(), Grade::Used, None)
        .await
        .unwrap();
    assert_eq!(h.quantity(code, Grade::Used).await, 1);

    let corrected = h
        .issuance
        .correct_return_grade(movement.id_typed(), Grade::Used)
        .await
        .unwrap();
    assert_eq!(corrected.returned_grade(), Some(Grade::Used));
    assert_eq!(h.quantity(code, Grade::Good).await, 0);
    assert_eq!(h.quantity(code, Grade::Used).await, 4);
}

#[tokio::test]
async fn movement_deletion_has_no_stock_side_effect() {
    let h = Harness::new().await;
    let code = h.register_item().await;
    h.stock_up(code, 5).await;

    let movement = h
        .issuance
        .issue(EmployeeId::new(), code, 2, "winter rotation", None)
        .await
        .unwrap();
    assert_eq!(h.quantity(code, Grade::New).await, 3);

    h.issuance.remove(movement.id_typed()).await.unwrap();
    assert_eq!(h.quantity(code, Grade::New).await, 3);

    let err = h.issuance.remove(movement.id_typed()).await.unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::NotFound)));
}

#[tokio::test]
async fn fulfillment_adds_stock_exactly_once() {
    let h = Harness::new().await;
    let code = h.register_item().await;

    let order = h
        .replenishment
        .place(code, 20, Some("Workwear Supplies Ltd".into()), None, None)
        .await
        .unwrap();

    let outcome = h.replenishment.fulfill(order.id_typed()).await.unwrap();
    assert_eq!(outcome.added_quantity, 20);
    assert_eq!(outcome.new_stock_level, 20);
    assert_eq!(h.quantity(code, Grade::New).await, 20);

    // Second fulfill is a no-op.
    let again = h.replenishment.fulfill(order.id_typed()).await.unwrap();
    assert_eq!(again.added_quantity, 0);
    assert_eq!(again.new_stock_level, 20);
    assert_eq!(h.quantity(code, Grade::New).await, 20);
}

#[tokio::test]
async fn terminal_order_states_reject_the_opposite_transition() {
    let h = Harness::new().await;
    let code = h.register_item().await;

    let cancelled = h
        .replenishment
        .place(code, 5, None, None, None)
        .await
        .unwrap();
    h.replenishment.cancel(cancelled.id_typed()).await.unwrap();
    // Idempotent repeat.
    h.replenishment.cancel(cancelled.id_typed()).await.unwrap();

    let err = h
        .replenishment
        .fulfill(cancelled.id_typed())
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::InvalidState(_))));
    assert_eq!(h.quantity(code, Grade::New).await, 0);

    let fulfilled = h
        .replenishment
        .place(code, 5, None, None, None)
        .await
        .unwrap();
    h.replenishment.fulfill(fulfilled.id_typed()).await.unwrap();
    let err = h
        .replenishment
        .cancel(fulfilled.id_typed())
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::InvalidState(_))));
}

#[tokio::test]
async fn pending_orders_view_tracks_placed_orders_only() {
    let h = Harness::new().await;
    let code = h.register_item().await;

    let a = h.replenishment.place(code, 1, None, None, None).await.unwrap();
    let b = h.replenishment.place(code, 2, None, None, None).await.unwrap();
    h.replenishment.fulfill(a.id_typed()).await.unwrap();

    let pending = h.replenishment.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id_typed(), b.id_typed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_issues_never_drive_a_bucket_negative() {
    let h = Harness::new().await;
    let code = h.register_item().await;
    h.stock_up(code, 10).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let issuance = h.issuance.clone();
        handles.push(tokio::spawn(async move {
            issuance
                .issue(EmployeeId::new(), code, 1, "winter rotation", None)
                .await
        }));
    }

    let mut issued = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.expect("task") {
            Ok(_) => issued += 1,
            Err(err) => {
                assert_insufficient(err);
                refused += 1;
            }
        }
    }

    assert_eq!(issued, 10);
    assert_eq!(refused, 10);
    assert_eq!(h.quantity(code, Grade::New).await, 0);
    assert_eq!(h.issuance.list_active().await.unwrap().len(), 10);
}

#[tokio::test]
async fn movement_views_filter_by_employee_and_item() {
    let h = Harness::new().await;
    let code = h.register_item().await;
    h.stock_up(code, 6).await;

    let alice = EmployeeId::new();
    let bob = EmployeeId::new();
    h.issuance
        .issue(alice, code, 1, "winter rotation", None)
        .await
        .unwrap();
    h.issuance
        .issue(alice, code, 2, "spare set", None)
        .await
        .unwrap();
    let bobs = h
        .issuance
        .issue(bob, code, 3, "winter rotation", None)
        .await
        .unwrap();
    h.issuance
        .mark_return(bobs.id_typed(), Grade::Good, None)
        .await
        .unwrap();

    assert_eq!(h.issuance.list_for_employee(alice).await.unwrap().len(), 2);
    assert_eq!(h.issuance.list_for_employee(bob).await.unwrap().len(), 1);
    assert_eq!(h.issuance.list_for_item(code).await.unwrap().len(), 3);
    assert_eq!(h.issuance.list_active().await.unwrap().len(), 2);
    assert_eq!(h.issuance.list_returned().await.unwrap().len(), 1);
    assert_eq!(
        h.replenishment.list_for_item(code).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn total_on_hand_sums_every_bucket() {
    let h = Harness::new().await;
    let code = h.register_item().await;
    h.stock_up(code, 8).await;

    let movement = h
        .issuance
        .issue(EmployeeId::new(), code, 3, "winter rotation", None)
        .await
        .unwrap();
    h.issuance
        .mark_return(movement.id_typed(), Grade::Used, None)
        .await
        .unwrap();

    // 5 new + 3 used.
    assert_eq!(h.stock.total_on_hand().await.unwrap(), 8);

    let other = ItemDraft::new("Boots", "Black", "44").unwrap();
    let other_code = h.catalog.register(other).await.unwrap().code();
    h.stock_up(other_code, 2).await;
    assert_eq!(h.stock.total_on_hand().await.unwrap(), 10);
}
