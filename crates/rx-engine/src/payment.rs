//! # Payment Workflow
//!
//! The only post-creation mutation a bill ever sees.
//!
//! ## State Machine
//! ```text
//!   pending ──► paid ──► refunded
//!      │          │          │
//!      └── no-op ─┴── no-op ─┘   (re-submitting the current state
//!                                 succeeds without changing anything)
//! ```
//!
//! paid never silently reverts to pending; a reversal is the distinct
//! refunded state with its own audit timestamp. The workflow never touches
//! stock or prescription state.

use chrono::Utc;
use tracing::info;

use rx_core::{Bill, BillItem, PaymentMethod, PaymentStatus, ValidationError};
use rx_db::Database;

use crate::error::{EngineError, EngineResult};

/// Payment-status lifecycle for bills.
#[derive(Debug, Clone)]
pub struct PaymentWorkflow {
    db: Database,
}

impl PaymentWorkflow {
    /// Creates a new workflow over the given database.
    pub fn new(db: Database) -> Self {
        PaymentWorkflow { db }
    }

    /// Gets a bill by ID.
    pub async fn get_bill(&self, bill_id: &str) -> EngineResult<Bill> {
        self.db
            .bills()
            .get_by_id(bill_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Bill", bill_id))
    }

    /// Gets a bill's frozen line items.
    pub async fn get_bill_items(&self, bill_id: &str) -> EngineResult<Vec<BillItem>> {
        Ok(self.db.bills().get_items(bill_id).await?)
    }

    /// Moves a bill's payment status forward.
    ///
    /// ## Contract
    /// - `pending -> paid` records method, transaction id, and paid_at
    /// - `paid -> refunded` records refunded_at; original settlement fields
    ///   are kept
    /// - re-submitting the bill's current status is an idempotent no-op
    ///   success (safe under caller retries)
    /// - anything else (`paid -> pending`, `pending -> refunded`,
    ///   `refunded -> *`) is rejected as invalid input
    pub async fn update_payment_status(
        &self,
        bill_id: &str,
        status: PaymentStatus,
        method: Option<PaymentMethod>,
        transaction_id: Option<&str>,
    ) -> EngineResult<Bill> {
        let bill = self.get_bill(bill_id).await?;

        // Idempotent re-submission.
        if bill.payment_status == status {
            return Ok(bill);
        }

        let now = Utc::now();

        let transitioned = match (bill.payment_status, status) {
            (PaymentStatus::Pending, PaymentStatus::Paid) => {
                self.db
                    .bills()
                    .set_paid(bill_id, method, transaction_id, now)
                    .await?
            }
            (PaymentStatus::Paid, PaymentStatus::Refunded) => {
                self.db
                    .bills()
                    .set_refunded(bill_id, transaction_id, now)
                    .await?
            }
            (from, to) => {
                return Err(EngineError::InvalidInput(ValidationError::InvalidValue {
                    field: "paymentStatus".to_string(),
                    reason: format!("cannot transition {from:?} -> {to:?}"),
                }));
            }
        };

        if !transitioned {
            // Lost a race: someone else moved the status between our read
            // and the guarded update. Re-read and decide: reaching the
            // requested state some other way is still success.
            let current = self.get_bill(bill_id).await?;
            if current.payment_status == status {
                return Ok(current);
            }
            return Err(EngineError::InvalidInput(ValidationError::InvalidValue {
                field: "paymentStatus".to_string(),
                reason: format!(
                    "cannot transition {:?} -> {status:?}",
                    current.payment_status
                ),
            }));
        }

        let updated = self.get_bill(bill_id).await?;

        info!(
            bill_id = %bill_id,
            status = ?updated.payment_status,
            method = ?updated.payment_method,
            "Payment status updated"
        );

        Ok(updated)
    }
}
