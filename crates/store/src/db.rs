//! Database handle and schema bootstrap.

use core::str::FromStr;

use sqlx::Sqlite;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::StoreResult;

/// The persisted state: four tables per the logical layout of the system.
///
/// No SQL-level foreign keys: referential policy (e.g. refusing to delete an
/// item with stock or open movements) is enforced by the services, which also
/// have to express the cases plain constraints cannot (returned movements do
/// not pin their item).
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS items (
        code   INTEGER PRIMARY KEY,
        kind   TEXT NOT NULL,
        color  TEXT NOT NULL,
        size   TEXT NOT NULL,
        UNIQUE (kind, color, size)
    )",
    "CREATE TABLE IF NOT EXISTS stock_buckets (
        item_code INTEGER NOT NULL,
        grade     TEXT NOT NULL,
        quantity  INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
        PRIMARY KEY (item_code, grade)
    )",
    "CREATE TABLE IF NOT EXISTS movements (
        id             TEXT PRIMARY KEY,
        employee_id    TEXT NOT NULL,
        item_code      INTEGER NOT NULL,
        quantity       INTEGER NOT NULL,
        reason         TEXT NOT NULL,
        issued_at      TEXT NOT NULL,
        returned_at    TEXT,
        returned_grade TEXT
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id         TEXT PRIMARY KEY,
        item_code  INTEGER NOT NULL,
        quantity   INTEGER NOT NULL,
        ordered_at TEXT NOT NULL,
        status     TEXT NOT NULL,
        supplier   TEXT,
        note       TEXT
    )",
];

/// Shared SQLite handle.
///
/// The pool is capped at a single connection on purpose: every transaction
/// owns the sole connection for its duration, so the read-check-write
/// sequence in [`crate::stock::reserve`] is serialized across concurrent
/// callers and no interleaving can drive a bucket negative. A multi-writer
/// backend must replace this with row-level locking before raising the cap.
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open (creating if missing) the database at `url` and bootstrap the
    /// schema.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Open a fresh in-memory database (tests, dev fallback).
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Begin a transaction. All multi-row mutations go through here.
    pub async fn begin(&self) -> StoreResult<sqlx::Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Check out the connection for plain reads.
    pub async fn acquire(&self) -> StoreResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }
}
