//! # Medicine Repository
//!
//! Database operations for the medicine catalog.
//!
//! ## Key Operations
//! - Case-insensitive substring search (prescription text vs catalog names)
//! - CRUD with soft delete
//! - Atomic stock mutations
//!
//! ## Stock Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                            │
//! │                                                                     │
//! │  ❌ WRONG: read stock, compare, write (lost update under races)     │
//! │     SELECT stock_quantity ... ; UPDATE ... SET stock_quantity = 7   │
//! │                                                                     │
//! │  ✅ CORRECT: single conditional update                              │
//! │     UPDATE medicines                                                │
//! │     SET stock_quantity = stock_quantity - N                         │
//! │     WHERE id = ? AND stock_quantity >= N                            │
//! │                                                                     │
//! │  Zero rows affected = insufficient stock. Two pharmacists whose     │
//! │  combined demand exceeds stock can never both succeed.              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//! Stock is mutated only here: the fulfillment decrement and the audited
//! administrative adjustment. Callers never write stock inline.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use rx_core::{Medicine, StockAdjustment, StockAdjustmentOp};

/// All columns of the medicines table, in struct order.
const MEDICINE_COLUMNS: &str = "id, name, category, unit, unit_price_cents, \
     stock_quantity, is_active, created_at, updated_at";

/// Repository for medicine catalog operations.
#[derive(Debug, Clone)]
pub struct MedicineRepository {
    pool: SqlitePool,
}

impl MedicineRepository {
    /// Creates a new MedicineRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MedicineRepository { pool }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Searches active medicines by case-insensitive substring.
    ///
    /// ## Semantics
    /// A medicine matches when its name *contains* the query, ignoring case.
    /// This mirrors how prescription text is resolved against the catalog,
    /// so the search preview and fulfillment agree on what matches.
    ///
    /// An empty query returns active medicines sorted by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Medicine>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching medicines");

        if query.is_empty() {
            return self.list_active(Some(limit)).await;
        }

        let medicines = sqlx::query_as::<_, Medicine>(&format!(
            r#"
            SELECT {MEDICINE_COLUMNS}
            FROM medicines
            WHERE is_active = 1 AND instr(lower(name), lower(?1)) > 0
            ORDER BY name, id
            LIMIT ?2
            "#
        ))
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = medicines.len(), "Search returned medicines");
        Ok(medicines)
    }

    /// Lists active medicines sorted by name.
    pub async fn list_active(&self, limit: Option<u32>) -> DbResult<Vec<Medicine>> {
        let medicines = sqlx::query_as::<_, Medicine>(&format!(
            r#"
            SELECT {MEDICINE_COLUMNS}
            FROM medicines
            WHERE is_active = 1
            ORDER BY name, id
            LIMIT ?1
            "#
        ))
        .bind(limit.map(i64::from).unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;

        Ok(medicines)
    }

    /// Gets a medicine by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>(&format!(
            r#"
            SELECT {MEDICINE_COLUMNS}
            FROM medicines
            WHERE id = ?1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(medicine)
    }

    /// Gets a medicine by ID on an open transaction.
    pub async fn get_in_tx(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>(&format!(
            r#"
            SELECT {MEDICINE_COLUMNS}
            FROM medicines
            WHERE id = ?1
            "#
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(medicine)
    }

    /// Finds active catalog candidates for a prescription line name, on an
    /// open transaction so the set is consistent with the decrements that
    /// follow. The deterministic pick among candidates is rx-core's job.
    pub async fn find_candidates(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> DbResult<Vec<Medicine>> {
        let medicines = sqlx::query_as::<_, Medicine>(&format!(
            r#"
            SELECT {MEDICINE_COLUMNS}
            FROM medicines
            WHERE is_active = 1 AND instr(lower(name), lower(?1)) > 0
            ORDER BY name, id
            "#
        ))
        .bind(name.trim())
        .fetch_all(conn)
        .await?;

        Ok(medicines)
    }

    // =========================================================================
    // Catalog Maintenance (inventory workflow boundary)
    // =========================================================================

    /// Inserts a new medicine.
    pub async fn insert(&self, medicine: &Medicine) -> DbResult<()> {
        debug!(name = %medicine.name, "Inserting medicine");

        sqlx::query(
            r#"
            INSERT INTO medicines (
                id, name, category, unit, unit_price_cents,
                stock_quantity, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.category)
        .bind(&medicine.unit)
        .bind(medicine.unit_price_cents)
        .bind(medicine.stock_quantity)
        .bind(medicine.is_active)
        .bind(medicine.created_at)
        .bind(medicine.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates catalog fields of an existing medicine.
    ///
    /// Deliberately does NOT write stock_quantity: stock moves only through
    /// the atomic operations below.
    pub async fn update(&self, medicine: &Medicine) -> DbResult<()> {
        debug!(id = %medicine.id, "Updating medicine");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE medicines SET
                name = ?2,
                category = ?3,
                unit = ?4,
                unit_price_cents = ?5,
                is_active = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.category)
        .bind(&medicine.unit)
        .bind(medicine.unit_price_cents)
        .bind(medicine.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", &medicine.id));
        }

        Ok(())
    }

    /// Soft-deletes a medicine by setting is_active = false.
    ///
    /// Historical bills keep their frozen snapshots; a retired medicine can
    /// be restored, and name resolution skips it meanwhile.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting medicine");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE medicines SET is_active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", id));
        }

        Ok(())
    }

    /// Counts active medicines (for diagnostics).
    pub async fn count_active(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Atomic Stock Operations
    // =========================================================================

    /// Conditionally decrements stock on an open fulfillment transaction.
    ///
    /// Returns `Ok(true)` when the decrement applied, `Ok(false)` when stock
    /// was insufficient (zero rows matched the conditional update). Never
    /// takes stock negative.
    pub async fn try_decrement_stock(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE medicines
            SET stock_quantity = stock_quantity - ?2, updated_at = ?3
            WHERE id = ?1 AND is_active = 1 AND stock_quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Reads current stock on an open transaction (for shortfall reporting).
    pub async fn stock_in_tx(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<i64>> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM medicines WHERE id = ?1")
                .bind(id)
                .fetch_optional(conn)
                .await?;

        Ok(stock)
    }

    /// Applies an administrative stock adjustment (restock, manual
    /// correction) and records it in the audit trail.
    ///
    /// ## Invariant
    /// Shares the non-negative-stock rule with fulfillment: `Subtract` uses
    /// the same conditional-update shape and fails rather than going
    /// negative; `Set` rejects negative targets. Runs in its own short
    /// transaction, never inside a fulfillment.
    pub async fn adjust_stock(
        &self,
        id: &str,
        op: StockAdjustmentOp,
        quantity: i64,
        reason: &str,
        adjusted_by: &str,
    ) -> DbResult<Medicine> {
        debug!(id = %id, ?op, quantity = %quantity, "Adjusting stock");

        if quantity < 0 {
            return Err(DbError::CheckViolation {
                message: "adjustment quantity must not be negative".to_string(),
            });
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = match op {
            StockAdjustmentOp::Add => {
                sqlx::query(
                    r#"
                    UPDATE medicines
                    SET stock_quantity = stock_quantity + ?2, updated_at = ?3
                    WHERE id = ?1
                    "#,
                )
                .bind(id)
                .bind(quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?
            }
            StockAdjustmentOp::Subtract => {
                sqlx::query(
                    r#"
                    UPDATE medicines
                    SET stock_quantity = stock_quantity - ?2, updated_at = ?3
                    WHERE id = ?1 AND stock_quantity >= ?2
                    "#,
                )
                .bind(id)
                .bind(quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?
            }
            StockAdjustmentOp::Set => {
                sqlx::query(
                    r#"
                    UPDATE medicines
                    SET stock_quantity = ?2, updated_at = ?3
                    WHERE id = ?1
                    "#,
                )
                .bind(id)
                .bind(quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            // Distinguish a missing medicine from a rejected subtraction.
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT stock_quantity FROM medicines WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;

            return match exists {
                None => Err(DbError::not_found("Medicine", id)),
                Some(stock) => Err(DbError::CheckViolation {
                    message: format!(
                        "cannot subtract {quantity} from stock {stock}: stock would go negative"
                    ),
                }),
            };
        }

        let medicine = sqlx::query_as::<_, Medicine>(&format!(
            r#"
            SELECT {MEDICINE_COLUMNS}
            FROM medicines
            WHERE id = ?1
            "#
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let adjustment = StockAdjustment {
            id: Uuid::new_v4().to_string(),
            medicine_id: id.to_string(),
            op,
            quantity,
            resulting_stock: medicine.stock_quantity,
            reason: reason.to_string(),
            adjusted_by: adjusted_by.to_string(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO stock_adjustments (
                id, medicine_id, op, quantity, resulting_stock,
                reason, adjusted_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&adjustment.id)
        .bind(&adjustment.medicine_id)
        .bind(adjustment.op)
        .bind(adjustment.quantity)
        .bind(adjustment.resulting_stock)
        .bind(&adjustment.reason)
        .bind(&adjustment.adjusted_by)
        .bind(adjustment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(medicine)
    }

    /// Lists the adjustment audit trail for a medicine, newest first.
    pub async fn adjustments_for(&self, medicine_id: &str) -> DbResult<Vec<StockAdjustment>> {
        let adjustments = sqlx::query_as::<_, StockAdjustment>(
            r#"
            SELECT id, medicine_id, op, quantity, resulting_stock,
                   reason, adjusted_by, created_at
            FROM stock_adjustments
            WHERE medicine_id = ?1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(medicine_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(adjustments)
    }
}

/// Helper to generate a new medicine ID.
pub fn generate_medicine_id() -> String {
    Uuid::new_v4().to_string()
}
