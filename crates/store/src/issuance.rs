//! Issuance/return engine: employee-facing stock movements.
//!
//! Every mutation pairs a movement-record change with the matching bucket
//! change inside one transaction; either both land or neither does.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqliteConnection;

use kitroom_core::{DomainError, EmployeeId, ItemCode, MovementId};
use kitroom_issuance::Movement;
use kitroom_ledger::Grade;

use crate::catalog;
use crate::db::Db;
use crate::error::StoreResult;
use crate::stock;

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: String,
    employee_id: String,
    item_code: i64,
    quantity: i64,
    reason: String,
    issued_at: DateTime<Utc>,
    returned_at: Option<DateTime<Utc>>,
    returned_grade: Option<String>,
}

impl MovementRow {
    fn into_movement(self) -> StoreResult<Movement> {
        Ok(Movement::from_parts(
            self.id.parse::<MovementId>()?,
            self.employee_id.parse::<EmployeeId>()?,
            ItemCode::new(self.item_code)?,
            self.quantity,
            self.reason,
            self.issued_at,
            self.returned_at,
            self.returned_grade
                .as_deref()
                .map(str::parse::<Grade>)
                .transpose()?,
        ))
    }
}

const SELECT_MOVEMENT: &str = "SELECT id, employee_id, item_code, quantity, reason, \
     issued_at, returned_at, returned_grade FROM movements";

async fn find_by_id(
    conn: &mut SqliteConnection,
    id: MovementId,
) -> StoreResult<Option<Movement>> {
    let row: Option<MovementRow> = sqlx::query_as(&format!("{SELECT_MOVEMENT} WHERE id = ?1"))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.map(MovementRow::into_movement).transpose()
}

async fn insert_movement(conn: &mut SqliteConnection, movement: &Movement) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO movements (id, employee_id, item_code, quantity, reason, issued_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(movement.id_typed().to_string())
    .bind(movement.employee_id().to_string())
    .bind(movement.item_code().as_i64())
    .bind(movement.quantity())
    .bind(movement.reason())
    .bind(movement.issued_at())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn update_return_fields(
    conn: &mut SqliteConnection,
    movement: &Movement,
) -> StoreResult<()> {
    sqlx::query("UPDATE movements SET returned_at = ?2, returned_grade = ?3 WHERE id = ?1")
        .bind(movement.id_typed().to_string())
        .bind(movement.returned_at())
        .bind(movement.returned_grade().map(|g| g.as_str()))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn list_where(conn: &mut SqliteConnection, filter: &str) -> StoreResult<Vec<Movement>> {
    let rows: Vec<MovementRow> =
        sqlx::query_as(&format!("{SELECT_MOVEMENT} {filter} ORDER BY issued_at, id"))
            .fetch_all(&mut *conn)
            .await?;
    rows.into_iter().map(MovementRow::into_movement).collect()
}

/// One entry of a bulk return.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchReturnEntry {
    pub movement_id: MovementId,
    pub grade: Grade,
}

/// Issuance/return engine.
#[derive(Debug, Clone)]
pub struct IssuanceService {
    db: Db,
}

impl IssuanceService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Issue `quantity` units of an item to an employee, drawing from the
    /// "new" bucket.
    ///
    /// On `InsufficientStock` the transaction aborts and no record exists.
    pub async fn issue(
        &self,
        employee_id: EmployeeId,
        item_code: ItemCode,
        quantity: i64,
        reason: &str,
        issued_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Movement> {
        let mut tx = self.db.begin().await?;

        if catalog::find_by_code(&mut tx, item_code).await?.is_none() {
            return Err(DomainError::not_found().into());
        }

        let movement = Movement::issue(
            MovementId::new(),
            employee_id,
            item_code,
            quantity,
            reason,
            issued_at.unwrap_or_else(Utc::now),
        )?;

        stock::reserve(&mut tx, item_code, Grade::New, quantity).await?;
        insert_movement(&mut tx, &movement).await?;
        tx.commit().await?;

        tracing::info!(
            movement = %movement.id_typed(),
            item = item_code.as_i64(),
            quantity,
            "issued stock to employee"
        );
        Ok(movement)
    }

    /// Record the return of a movement at the assessed grade.
    ///
    /// At-most-once: a movement that is already returned is a no-op and the
    /// stored record comes back unchanged; stock is never incremented twice.
    pub async fn mark_return(
        &self,
        id: MovementId,
        grade: Grade,
        returned_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Movement> {
        let mut tx = self.db.begin().await?;

        let mut movement = find_by_id(&mut tx, id).await?.ok_or(DomainError::NotFound)?;
        if movement.is_returned() {
            return Ok(movement);
        }

        movement.close(grade, returned_at.unwrap_or_else(Utc::now))?;
        stock::release(&mut tx, movement.item_code(), grade, movement.quantity()).await?;
        update_return_fields(&mut tx, &movement).await?;
        tx.commit().await?;

        tracing::info!(
            movement = %movement.id_typed(),
            grade = grade.as_str(),
            "movement returned"
        );
        Ok(movement)
    }

    /// Return several movements under one transaction and one shared
    /// timestamp.
    ///
    /// All-or-nothing: any entry referencing a missing movement rolls back
    /// the entire batch. Entries that are already returned are per-entry
    /// no-ops, like [`IssuanceService::mark_return`].
    pub async fn mark_return_batch(
        &self,
        entries: &[BatchReturnEntry],
        returned_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Movement>> {
        let shared_at = returned_at.unwrap_or_else(Utc::now);
        let mut tx = self.db.begin().await?;
        let mut out = Vec::with_capacity(entries.len());

        for entry in entries {
            let mut movement = find_by_id(&mut tx, entry.movement_id)
                .await?
                .ok_or(DomainError::NotFound)?;
            if movement.is_returned() {
                out.push(movement);
                continue;
            }

            movement.close(entry.grade, shared_at)?;
            stock::release(&mut tx, movement.item_code(), entry.grade, movement.quantity())
                .await?;
            update_return_fields(&mut tx, &movement).await?;
            out.push(movement);
        }

        tx.commit().await?;
        tracing::info!(count = out.len(), "batch return committed");
        Ok(out)
    }

    /// Correct the recorded grade of a returned movement, moving the returned
    /// quantity between the two buckets.
    pub async fn correct_return_grade(
        &self,
        id: MovementId,
        new_grade: Grade,
    ) -> StoreResult<Movement> {
        let mut tx = self.db.begin().await?;

        let mut movement = find_by_id(&mut tx, id).await?.ok_or(DomainError::NotFound)?;
        let old_grade = movement.change_returned_grade(new_grade)?;
        if old_grade == new_grade {
            return Ok(movement);
        }

        stock::move_grade(
            &mut tx,
            movement.item_code(),
            old_grade,
            new_grade,
            movement.quantity(),
        )
        .await?;
        update_return_fields(&mut tx, &movement).await?;
        tx.commit().await?;

        tracing::info!(
            movement = %movement.id_typed(),
            from = old_grade.as_str(),
            to = new_grade.as_str(),
            "return grade corrected"
        );
        Ok(movement)
    }

    /// Administrative deletion: the record vanishes, stock stays untouched.
    pub async fn remove(&self, id: MovementId) -> StoreResult<()> {
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query("DELETE FROM movements WHERE id = ?1")
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found().into());
        }
        Ok(())
    }

    pub async fn get(&self, id: MovementId) -> StoreResult<Movement> {
        let mut conn = self.db.acquire().await?;
        find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    pub async fn list(&self) -> StoreResult<Vec<Movement>> {
        let mut conn = self.db.acquire().await?;
        list_where(&mut conn, "").await
    }

    /// Movements that have not been returned yet.
    pub async fn list_active(&self) -> StoreResult<Vec<Movement>> {
        let mut conn = self.db.acquire().await?;
        list_where(&mut conn, "WHERE returned_at IS NULL").await
    }

    pub async fn list_returned(&self) -> StoreResult<Vec<Movement>> {
        let mut conn = self.db.acquire().await?;
        list_where(&mut conn, "WHERE returned_at IS NOT NULL").await
    }

    pub async fn list_for_employee(&self, employee_id: EmployeeId) -> StoreResult<Vec<Movement>> {
        let mut conn = self.db.acquire().await?;
        let rows: Vec<MovementRow> = sqlx::query_as(&format!(
            "{SELECT_MOVEMENT} WHERE employee_id = ?1 ORDER BY issued_at, id"
        ))
        .bind(employee_id.to_string())
        .fetch_all(&mut *conn)
        .await?;
        rows.into_iter().map(MovementRow::into_movement).collect()
    }

    pub async fn list_for_item(&self, item_code: ItemCode) -> StoreResult<Vec<Movement>> {
        let mut conn = self.db.acquire().await?;
        let rows: Vec<MovementRow> = sqlx::query_as(&format!(
            "{SELECT_MOVEMENT} WHERE item_code = ?1 ORDER BY issued_at, id"
        ))
        .bind(item_code.as_i64())
        .fetch_all(&mut *conn)
        .await?;
        rows.into_iter().map(MovementRow::into_movement).collect()
    }
}
