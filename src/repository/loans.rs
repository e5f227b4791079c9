//! Loans repository, shared by every lendable item kind
//!
//! Table and column names come from the [`ItemKind`] marker, so book and
//! apparatus loans go through the same queries.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::loan::{CatalogEntry, LoanRecord, LoanRow, LoanStatus},
    services::policy::ItemKind,
};

const LOAN_COLUMNS: &str = "student_id, item_id, borrowed_at, due_date, returned_at, \
     extensions_used, fine_amount, fine_paid, is_damaged, status";

/// Filters for a loan listing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
    pub student_id: Option<i32>,
    pub unpaid_fines: bool,
}

pub struct LoansRepository<K: ItemKind> {
    pool: Pool<Postgres>,
    kind: PhantomData<fn() -> K>,
}

impl<K: ItemKind> Clone for LoansRepository<K> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<K: ItemKind> LoansRepository<K> {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            kind: PhantomData,
        }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    fn item_select() -> String {
        format!(
            "SELECT id, {label} AS label, {total} AS total, {available} AS available, \
             ({exempt}) AS extension_exempt, ({fine})::numeric AS damage_fine FROM {table}",
            label = K::LABEL_COLUMN,
            total = K::TOTAL_COLUMN,
            available = K::AVAILABLE_COLUMN,
            exempt = K::EXEMPT_EXPR,
            fine = K::DAMAGE_FINE_EXPR,
            table = K::ITEM_TABLE,
        )
    }

    fn row_select() -> String {
        format!(
            r#"
            SELECT l.*, i.{label} AS item_label, s.name AS student_name, s.roll_number
            FROM {loans} l
            JOIN {items} i ON i.id = l.item_id
            JOIN students s ON s.id = l.student_id
            "#,
            label = K::LABEL_COLUMN,
            loans = K::LOAN_TABLE,
            items = K::ITEM_TABLE,
        )
    }

    /// Read a catalog item inside a transaction
    pub async fn get_item(&self, conn: &mut PgConnection, item_id: i32) -> AppResult<CatalogEntry> {
        sqlx::query_as::<_, CatalogEntry>(&format!("{} WHERE id = $1", Self::item_select()))
            .bind(item_id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} with id {} not found", K::NOUN, item_id)))
    }

    /// Read and lock a catalog item for the rest of the transaction
    pub async fn lock_item(&self, conn: &mut PgConnection, item_id: i32) -> AppResult<CatalogEntry> {
        sqlx::query_as::<_, CatalogEntry>(&format!(
            "{} WHERE id = $1 FOR UPDATE",
            Self::item_select()
        ))
        .bind(item_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} with id {} not found", K::NOUN, item_id)))
    }

    /// Whether the student holds an unreturned loan of this item
    pub async fn has_active(&self, conn: &mut PgConnection, student_id: i32, item_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE student_id = $1 AND item_id = $2 AND returned_at IS NULL)",
            K::LOAN_TABLE
        ))
        .bind(student_id)
        .bind(item_id)
        .fetch_one(conn)
        .await?;
        Ok(exists)
    }

    /// Take one copy off the shelf; false when none is left
    pub async fn decrement_available(&self, conn: &mut PgConnection, item_id: i32) -> AppResult<bool> {
        let result = sqlx::query(&format!(
            "UPDATE {table} SET {col} = {col} - 1 WHERE id = $1 AND {col} > 0",
            table = K::ITEM_TABLE,
            col = K::AVAILABLE_COLUMN,
        ))
        .bind(item_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Put one copy back on the shelf; false when the shelf is already full
    pub async fn increment_available(&self, conn: &mut PgConnection, item_id: i32) -> AppResult<bool> {
        let result = sqlx::query(&format!(
            "UPDATE {table} SET {col} = {col} + 1 WHERE id = $1 AND {col} < {total}",
            table = K::ITEM_TABLE,
            col = K::AVAILABLE_COLUMN,
            total = K::TOTAL_COLUMN,
        ))
        .bind(item_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Insert a new loan and return its id
    pub async fn insert(&self, conn: &mut PgConnection, loan: &LoanRecord) -> AppResult<i32> {
        let id: i32 = sqlx::query_scalar(&format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
            K::LOAN_TABLE,
            LOAN_COLUMNS
        ))
        .bind(loan.student_id)
        .bind(loan.item_id)
        .bind(loan.borrowed_at)
        .bind(loan.due_date)
        .bind(loan.returned_at)
        .bind(loan.extensions_used)
        .bind(loan.fine_amount)
        .bind(loan.fine_paid)
        .bind(loan.is_damaged)
        .bind(&loan.status)
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    /// Read and lock a loan row for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<LoanRecord> {
        sqlx::query_as::<_, LoanRecord>(&format!(
            "SELECT * FROM {} WHERE id = $1 FOR UPDATE",
            K::LOAN_TABLE
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} loan with id {} not found", K::NOUN, id)))
    }

    /// Persist the mutable fields of a loan
    pub async fn save(&self, conn: &mut PgConnection, loan: &LoanRecord) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            UPDATE {} SET
                due_date = $2, returned_at = $3, extensions_used = $4,
                fine_amount = $5, fine_paid = $6, is_damaged = $7, status = $8
            WHERE id = $1
            "#,
            K::LOAN_TABLE
        ))
        .bind(loan.id)
        .bind(loan.due_date)
        .bind(loan.returned_at)
        .bind(loan.extensions_used)
        .bind(loan.fine_amount)
        .bind(loan.fine_paid)
        .bind(loan.is_damaged)
        .bind(&loan.status)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Get a loan with its item and student labels
    pub async fn get_row(&self, id: i32) -> AppResult<LoanRow> {
        sqlx::query_as::<_, LoanRow>(&format!("{} WHERE l.id = $1", Self::row_select()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} loan with id {} not found", K::NOUN, id)))
    }

    /// List loans, newest first. Status filters are evaluated against `now`.
    pub async fn list(&self, filter: LoanFilter, now: DateTime<Utc>) -> AppResult<Vec<LoanRow>> {
        let mut conditions = vec!["($1::int IS NULL OR l.student_id = $1)".to_string()];

        match filter.status {
            Some(LoanStatus::Active) => conditions
                .push("l.returned_at IS NULL AND (l.due_date IS NULL OR l.due_date >= $2)".to_string()),
            Some(LoanStatus::Overdue) => {
                conditions.push("l.returned_at IS NULL AND l.due_date < $2".to_string())
            }
            Some(LoanStatus::Returned) => conditions.push("l.returned_at IS NOT NULL".to_string()),
            None => {}
        }
        if filter.unpaid_fines {
            conditions.push(
                "NOT l.fine_paid AND (l.fine_amount > 0 OR (l.returned_at IS NULL AND l.due_date < $2))"
                    .to_string(),
            );
        }

        let query = format!(
            "{} WHERE {} ORDER BY l.borrowed_at DESC, l.id DESC",
            Self::row_select(),
            conditions.join(" AND ")
        );

        let mut builder = sqlx::query_as::<_, LoanRow>(&query).bind(filter.student_id);
        if query.contains("$2") {
            builder = builder.bind(now);
        }
        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Count unreturned loans
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE returned_at IS NULL",
            K::LOAN_TABLE
        ))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count unreturned loans past their due date
    pub async fn count_overdue(&self, now: DateTime<Utc>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE returned_at IS NULL AND due_date < $1",
            K::LOAN_TABLE
        ))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count loans carrying a fine that is owed and not yet paid
    pub async fn count_unpaid_fines(&self, now: DateTime<Utc>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            r#"
            SELECT COUNT(*) FROM {}
            WHERE NOT fine_paid
              AND (fine_amount > 0 OR (returned_at IS NULL AND due_date < $1))
            "#,
            K::LOAN_TABLE
        ))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
