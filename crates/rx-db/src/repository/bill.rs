//! # Bill Repository
//!
//! Database operations for bills and their frozen line items.
//!
//! ## Bill Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Bill Lifecycle                               │
//! │                                                                     │
//! │  1. CREATE (fulfillment transaction only)                           │
//! │     └── insert_with_items() → Bill + frozen BillItems               │
//! │         UNIQUE(prescription_id) makes the insert the                │
//! │         one-bill-per-prescription guard                             │
//! │                                                                     │
//! │  2. SETTLE (payment workflow)                                       │
//! │     └── set_paid()     pending → paid                               │
//! │     └── set_refunded() paid → refunded                              │
//! │     Everything else on the row is immutable after creation          │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use rx_core::{Bill, BillItem, PaymentMethod, PaymentStatus};

/// All columns of the bills table, in struct order.
const BILL_COLUMNS: &str = "id, prescription_id, patient_id, appointment_id, \
     original_cents, discount_percent, discount_cents, final_cents, \
     payment_status, payment_method, payment_transaction_id, paid_at, refunded_at, \
     notes, generated_by, created_at, updated_at";

/// All columns of the bill_items table, in struct order.
const ITEM_COLUMNS: &str = "id, bill_id, medicine_id, name_snapshot, unit_snapshot, \
     unit_price_cents, quantity, line_total_cents, created_at";

/// Repository for bill operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    // =========================================================================
    // Creation (fulfillment transaction)
    // =========================================================================

    /// Inserts a bill and its frozen items on an open fulfillment
    /// transaction.
    ///
    /// A `UniqueViolation` on `bills.prescription_id` here means another
    /// fulfillment won the race; the engine maps it to `AlreadyBilled`.
    pub async fn insert_with_items(
        &self,
        conn: &mut SqliteConnection,
        bill: &Bill,
        items: &[BillItem],
    ) -> DbResult<()> {
        debug!(id = %bill.id, prescription_id = %bill.prescription_id, "Inserting bill");

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, prescription_id, patient_id, appointment_id,
                original_cents, discount_percent, discount_cents, final_cents,
                payment_status, payment_method, payment_transaction_id,
                paid_at, refunded_at, notes, generated_by, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17
            )
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.prescription_id)
        .bind(&bill.patient_id)
        .bind(&bill.appointment_id)
        .bind(bill.original_cents)
        .bind(bill.discount_percent)
        .bind(bill.discount_cents)
        .bind(bill.final_cents)
        .bind(bill.payment_status)
        .bind(bill.payment_method)
        .bind(&bill.payment_transaction_id)
        .bind(bill.paid_at)
        .bind(bill.refunded_at)
        .bind(&bill.notes)
        .bind(&bill.generated_by)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&mut *conn)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    id, bill_id, medicine_id, name_snapshot, unit_snapshot,
                    unit_price_cents, quantity, line_total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&item.bill_id)
            .bind(&item.medicine_id)
            .bind(&item.name_snapshot)
            .bind(&item.unit_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.line_total_cents)
            .bind(item.created_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Gets a bill by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            r#"
            SELECT {BILL_COLUMNS}
            FROM bills
            WHERE id = ?1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Finds the bill for a prescription, if one exists.
    ///
    /// Bill existence is the "already fulfilled" marker; callers use this
    /// to resolve an unknown-outcome retry before re-running fulfillment.
    pub async fn find_by_prescription(&self, prescription_id: &str) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            r#"
            SELECT {BILL_COLUMNS}
            FROM bills
            WHERE prescription_id = ?1
            "#
        ))
        .bind(prescription_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Gets all items for a bill in insertion order.
    pub async fn get_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let items = sqlx::query_as::<_, BillItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM bill_items
            WHERE bill_id = ?1
            ORDER BY created_at, id
            "#
        ))
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    // =========================================================================
    // Payment Status (the only post-creation mutation)
    // =========================================================================

    /// Marks a pending bill paid.
    ///
    /// The `WHERE payment_status = 'pending'` guard makes the transition
    /// atomic: zero rows affected means the bill was not in the expected
    /// state (or doesn't exist), and the caller re-reads to decide.
    pub async fn set_paid(
        &self,
        id: &str,
        method: Option<PaymentMethod>,
        transaction_id: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bills SET
                payment_status = ?2,
                payment_method = ?3,
                payment_transaction_id = ?4,
                paid_at = ?5,
                updated_at = ?5
            WHERE id = ?1 AND payment_status = ?6
            "#,
        )
        .bind(id)
        .bind(PaymentStatus::Paid)
        .bind(method)
        .bind(transaction_id)
        .bind(paid_at)
        .bind(PaymentStatus::Pending)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Marks a paid bill refunded. Payment fields from the original
    /// settlement are kept; the refund gets its own timestamp.
    pub async fn set_refunded(
        &self,
        id: &str,
        transaction_id: Option<&str>,
        refunded_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bills SET
                payment_status = ?2,
                payment_transaction_id = COALESCE(?3, payment_transaction_id),
                refunded_at = ?4,
                updated_at = ?4
            WHERE id = ?1 AND payment_status = ?5
            "#,
        )
        .bind(id)
        .bind(PaymentStatus::Refunded)
        .bind(transaction_id)
        .bind(refunded_at)
        .bind(PaymentStatus::Paid)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Report Queries (read-only)
    // =========================================================================

    /// Lists bills created in [from, to), oldest first.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            r#"
            SELECT {BILL_COLUMNS}
            FROM bills
            WHERE created_at >= ?1 AND created_at < ?2
            ORDER BY created_at, id
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Lists bill items whose bill was created in [from, to).
    pub async fn items_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<BillItem>> {
        let items = sqlx::query_as::<_, BillItem>(
            r#"
            SELECT i.id, i.bill_id, i.medicine_id, i.name_snapshot, i.unit_snapshot,
                   i.unit_price_cents, i.quantity, i.line_total_cents, i.created_at
            FROM bill_items i
            INNER JOIN bills b ON b.id = i.bill_id
            WHERE b.created_at >= ?1 AND b.created_at < ?2
            ORDER BY i.created_at, i.id
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Counts all bills (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new bill ID.
pub fn generate_bill_id() -> String {
    Uuid::new_v4().to_string()
}

/// Helper to generate a new bill item ID.
pub fn generate_bill_item_id() -> String {
    Uuid::new_v4().to_string()
}
