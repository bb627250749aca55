//! Catalog registry persistence and service.

use sqlx::SqliteConnection;

use kitroom_catalog::{Item, ItemDraft, ItemPatch, next_code};
use kitroom_core::{DomainError, ItemCode};

use crate::db::Db;
use crate::error::StoreResult;

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    code: i64,
    kind: String,
    color: String,
    size: String,
}

impl ItemRow {
    fn into_item(self) -> StoreResult<Item> {
        let code = ItemCode::new(self.code)?;
        Ok(Item::from_parts(code, self.kind, self.color, self.size))
    }
}

const SELECT_ITEM: &str = "SELECT code, kind, color, size FROM items";

pub(crate) async fn find_by_code(
    conn: &mut SqliteConnection,
    code: ItemCode,
) -> StoreResult<Option<Item>> {
    let row: Option<ItemRow> = sqlx::query_as(&format!("{SELECT_ITEM} WHERE code = ?1"))
        .bind(code.as_i64())
        .fetch_optional(&mut *conn)
        .await?;
    row.map(ItemRow::into_item).transpose()
}

/// Code of the item carrying exactly this attribute tuple, if any.
async fn find_code_by_tuple(
    conn: &mut SqliteConnection,
    kind: &str,
    color: &str,
    size: &str,
) -> StoreResult<Option<i64>> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT code FROM items WHERE kind = ?1 AND color = ?2 AND size = ?3")
            .bind(kind)
            .bind(color)
            .bind(size)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(|r| r.0))
}

async fn max_code(conn: &mut SqliteConnection) -> StoreResult<Option<i64>> {
    let (max,): (Option<i64>,) = sqlx::query_as("SELECT MAX(code) FROM items")
        .fetch_one(&mut *conn)
        .await?;
    Ok(max)
}

/// Catalog registry: item identity and descriptive attributes.
#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Db,
}

impl CatalogService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Register a new item definition, assigning the next catalog code.
    ///
    /// The duplicate check, the max-code read and the insert share one
    /// transaction, so two concurrent registrations can neither collide on a
    /// code nor both claim the same attribute tuple.
    pub async fn register(&self, draft: ItemDraft) -> StoreResult<Item> {
        let mut tx = self.db.begin().await?;

        if find_code_by_tuple(&mut tx, &draft.kind, &draft.color, &draft.size)
            .await?
            .is_some()
        {
            return Err(DomainError::conflict(format!(
                "item already registered: {}/{}/{}",
                draft.kind, draft.color, draft.size
            ))
            .into());
        }

        let code = next_code(max_code(&mut tx).await?);
        sqlx::query("INSERT INTO items (code, kind, color, size) VALUES (?1, ?2, ?3, ?4)")
            .bind(code.as_i64())
            .bind(&draft.kind)
            .bind(&draft.color)
            .bind(&draft.size)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(code = code.as_i64(), "registered catalog item");
        Ok(draft.into_item(code))
    }

    /// Fetch one item; `NotFound` if the code is unknown.
    pub async fn lookup(&self, code: ItemCode) -> StoreResult<Item> {
        let mut conn = self.db.acquire().await?;
        find_by_code(&mut conn, code)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    /// Apply a partial attribute update. The code never changes and stock is
    /// untouched.
    pub async fn update(&self, code: ItemCode, patch: ItemPatch) -> StoreResult<Item> {
        let patch = patch.validated()?;

        let mut tx = self.db.begin().await?;
        let mut item = find_by_code(&mut tx, code)
            .await?
            .ok_or(DomainError::NotFound)?;

        if !item.apply_patch(&patch) {
            return Ok(item);
        }

        let (kind, color, size) = item.attribute_tuple();
        if let Some(existing) = find_code_by_tuple(&mut tx, kind, color, size).await? {
            if existing != code.as_i64() {
                return Err(DomainError::conflict(format!(
                    "item already registered: {kind}/{color}/{size}"
                ))
                .into());
            }
        }

        sqlx::query("UPDATE items SET kind = ?2, color = ?3, size = ?4 WHERE code = ?1")
            .bind(code.as_i64())
            .bind(item.kind())
            .bind(item.color())
            .bind(item.size())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(item)
    }

    /// Delete a catalog entry.
    ///
    /// Refused with `Conflict` while the item still has stock on hand or open
    /// (unreturned) movements; returned movement history does not pin the
    /// item. Empty bucket rows are removed together with the entry.
    pub async fn remove(&self, code: ItemCode) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;

        if find_by_code(&mut tx, code).await?.is_none() {
            return Err(DomainError::not_found().into());
        }

        let (on_hand,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_buckets WHERE item_code = ?1",
        )
        .bind(code.as_i64())
        .fetch_one(&mut *tx)
        .await?;
        if on_hand > 0 {
            return Err(DomainError::conflict(format!(
                "item {code} still has {on_hand} units on hand"
            ))
            .into());
        }

        let (open,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM movements WHERE item_code = ?1 AND returned_at IS NULL",
        )
        .bind(code.as_i64())
        .fetch_one(&mut *tx)
        .await?;
        if open > 0 {
            return Err(DomainError::conflict(format!(
                "item {code} has {open} open movements"
            ))
            .into());
        }

        sqlx::query("DELETE FROM stock_buckets WHERE item_code = ?1")
            .bind(code.as_i64())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM items WHERE code = ?1")
            .bind(code.as_i64())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(code = code.as_i64(), "removed catalog item");
        Ok(())
    }

    /// Case-insensitive substring search over code (as text), kind, color and
    /// size.
    pub async fn search(&self, text: &str) -> StoreResult<Vec<Item>> {
        let pattern = format!("%{}%", text.trim().to_lowercase());
        let mut conn = self.db.acquire().await?;
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "{SELECT_ITEM} WHERE CAST(code AS TEXT) LIKE ?1 \
             OR lower(kind) LIKE ?1 OR lower(color) LIKE ?1 OR lower(size) LIKE ?1 \
             ORDER BY code"
        ))
        .bind(&pattern)
        .fetch_all(&mut *conn)
        .await?;
        rows.into_iter().map(ItemRow::into_item).collect()
    }

    /// The whole catalog, in code order.
    pub async fn list(&self) -> StoreResult<Vec<Item>> {
        let mut conn = self.db.acquire().await?;
        let rows: Vec<ItemRow> = sqlx::query_as(&format!("{SELECT_ITEM} ORDER BY code"))
            .fetch_all(&mut *conn)
            .await?;
        rows.into_iter().map(ItemRow::into_item).collect()
    }
}
