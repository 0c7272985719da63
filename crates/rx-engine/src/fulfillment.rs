//! # Fulfillment Engine
//!
//! Turns a prescription into dispensed stock plus an immutable bill, as one
//! logically atomic unit.
//!
//! ## The Core Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              Fulfillment is all-or-nothing                          │
//! │                                                                     │
//! │  BEGIN TRANSACTION                                                  │
//! │    1. touch prescription row        ← takes the db write lock,     │
//! │                                       doubles as existence check    │
//! │    2. per line: resolve catalog     ← explicit id, else substring  │
//! │       entry, then                     match with deterministic      │
//! │       conditional decrement:          tie-break                     │
//! │       UPDATE medicines                                              │
//! │       SET stock = stock - N                                         │
//! │       WHERE id = ? AND stock >= N                                   │
//! │    3. any line short? ROLLBACK, report every shortfall              │
//! │    4. insert bill + frozen items    ← UNIQUE(prescription_id)      │
//! │                                       closes the double-bill race   │
//! │    5. flip pending lines to administered                            │
//! │  COMMIT                             ← all three effects publish    │
//! │                                       together, or none do          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A preview (`preview_availability`) takes no locks and may go stale; the
//! transaction re-validates everything at commit time regardless.

use chrono::Utc;
use tracing::{debug, info};

use rx_core::availability::{pick_match, resolve_lines, AvailabilityReport};
use rx_core::validation::{validate_discount_percent, validate_quantity};
use rx_core::{
    Actor, Bill, BillItem, Medicine, Money, PaymentMethod, PaymentStatus, PrescriptionLine,
    StockShortage, ValidationError,
};
use rx_db::repository::bill::{generate_bill_id, generate_bill_item_id};
use rx_db::{Database, DbError};
use sqlx::SqliteConnection;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Request Types
// =============================================================================

/// Input for the full create-bill operation (pharmacist-specified discount
/// and notes).
#[derive(Debug, Clone)]
pub struct CreateBillRequest {
    pub prescription_id: String,

    /// Must match the prescription's patient; a mismatch is rejected before
    /// anything is touched.
    pub patient_id: String,

    /// Flat discount, 0-100.
    pub discount_percent: u32,

    pub notes: Option<String>,
}

/// How the bill is settled at creation time.
#[derive(Debug, Clone, Copy)]
enum Settlement {
    /// Bill starts pending; the payment workflow settles it later.
    Deferred,
    /// Cash collected on the spot (quick-process): bill starts paid.
    CashOnCounter,
}

// =============================================================================
// Fulfillment Engine
// =============================================================================

/// The fulfillment engine. Cheap to clone; every invocation runs on the
/// shared connection pool.
#[derive(Debug, Clone)]
pub struct FulfillmentEngine {
    db: Database,
}

impl FulfillmentEngine {
    /// Creates a new engine over the given database.
    pub fn new(db: Database) -> Self {
        FulfillmentEngine { db }
    }

    // =========================================================================
    // Read-only preview
    // =========================================================================

    /// Computes per-line availability for a prescription against the current
    /// catalog: match, stock coverage, estimated cost, substitutes.
    ///
    /// Side-effect-free and safe to call any number of times. The result is
    /// a point-in-time snapshot; `available = true` here does not reserve
    /// anything.
    pub async fn preview_availability(
        &self,
        prescription_id: &str,
    ) -> EngineResult<AvailabilityReport> {
        let prescription = self
            .db
            .prescriptions()
            .get_by_id(prescription_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Prescription", prescription_id))?;

        let lines = self.db.prescriptions().get_lines(&prescription.id).await?;
        let catalog = self.db.medicines().list_active(None).await?;

        Ok(resolve_lines(&prescription.id, &lines, &catalog))
    }

    // =========================================================================
    // Mutating entry points
    // =========================================================================

    /// Creates a bill for a prescription: validates availability, decrements
    /// stock, persists the bill, and marks every line administered, all or
    /// nothing. The bill starts with payment pending.
    pub async fn create_bill(&self, req: &CreateBillRequest, actor: &Actor) -> EngineResult<Bill> {
        validate_discount_percent(req.discount_percent)?;

        self.fulfill(
            &req.prescription_id,
            Some(&req.patient_id),
            req.discount_percent,
            req.notes.clone(),
            Settlement::Deferred,
            actor,
        )
        .await
    }

    /// Zero-touch fulfillment for cash-on-counter dispensing: identical
    /// contract to [`create_bill`](Self::create_bill), but the bill is
    /// settled immediately (paid, cash, now).
    pub async fn quick_process(
        &self,
        prescription_id: &str,
        discount_percent: u32,
        actor: &Actor,
    ) -> EngineResult<Bill> {
        validate_discount_percent(discount_percent)?;

        self.fulfill(
            prescription_id,
            None,
            discount_percent,
            None,
            Settlement::CashOnCounter,
            actor,
        )
        .await
    }

    /// Looks up the bill for a prescription, if any.
    ///
    /// Callers that observed neither success nor a recognized error (crash,
    /// timeout) use this before retrying: a bill here means the earlier
    /// attempt committed.
    pub async fn bill_for_prescription(
        &self,
        prescription_id: &str,
    ) -> EngineResult<Option<Bill>> {
        Ok(self.db.bills().find_by_prescription(prescription_id).await?)
    }

    /// Gets a bill's frozen line items.
    pub async fn bill_items(&self, bill_id: &str) -> EngineResult<Vec<BillItem>> {
        Ok(self.db.bills().get_items(bill_id).await?)
    }

    // =========================================================================
    // The transaction
    // =========================================================================

    /// Shared fulfillment path for both entry points.
    async fn fulfill(
        &self,
        prescription_id: &str,
        expected_patient: Option<&str>,
        discount_percent: u32,
        notes: Option<String>,
        settlement: Settlement,
        actor: &Actor,
    ) -> EngineResult<Bill> {
        let prescriptions = self.db.prescriptions();
        let medicines = self.db.medicines();
        let bills = self.db.bills();

        // Fast-path rejection; the race-proof guard is the UNIQUE constraint
        // hit at insert time below.
        if bills.find_by_prescription(prescription_id).await?.is_some() {
            return Err(EngineError::AlreadyBilled {
                prescription_id: prescription_id.to_string(),
            });
        }

        let prescription = prescriptions
            .get_by_id(prescription_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Prescription", prescription_id))?;

        if let Some(patient_id) = expected_patient {
            if patient_id != prescription.patient_id {
                return Err(EngineError::PatientMismatch {
                    prescription_id: prescription_id.to_string(),
                    patient_id: patient_id.to_string(),
                });
            }
        }

        let lines = prescriptions.get_lines(prescription_id).await?;
        if lines.is_empty() {
            return Err(EngineError::InvalidInput(ValidationError::InvalidValue {
                field: "prescription".to_string(),
                reason: "has no medicine lines".to_string(),
            }));
        }
        for line in &lines {
            validate_quantity(line.quantity)?;
        }

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        // First statement is a write: the connection takes the database
        // write lock here and holds it until commit, so concurrent
        // fulfillments queue on the busy timeout.
        if !prescriptions.touch(&mut tx, prescription_id, now).await? {
            return Err(EngineError::not_found("Prescription", prescription_id));
        }

        let bill_id = generate_bill_id();
        let mut items: Vec<BillItem> = Vec::with_capacity(lines.len());
        let mut shortages: Vec<StockShortage> = Vec::new();

        for line in &lines {
            let Some(medicine) = self.resolve_in_tx(&mut tx, line).await? else {
                shortages.push(StockShortage {
                    medicine_name: line.medicine_name.clone(),
                    requested: line.quantity,
                    available: 0,
                    matched: false,
                });
                continue;
            };

            let applied = medicines
                .try_decrement_stock(&mut tx, &medicine.id, line.quantity)
                .await?;

            if applied {
                items.push(BillItem {
                    id: generate_bill_item_id(),
                    bill_id: bill_id.clone(),
                    medicine_id: medicine.id.clone(),
                    name_snapshot: medicine.name.clone(),
                    unit_snapshot: medicine.unit.clone(),
                    unit_price_cents: medicine.unit_price_cents,
                    quantity: line.quantity,
                    line_total_cents: medicine
                        .unit_price()
                        .multiply_quantity(line.quantity)
                        .cents(),
                    created_at: now,
                });
            } else {
                let available = medicines
                    .stock_in_tx(&mut tx, &medicine.id)
                    .await?
                    .unwrap_or(0);
                shortages.push(StockShortage {
                    medicine_name: line.medicine_name.clone(),
                    requested: line.quantity,
                    available,
                    matched: true,
                });
            }
        }

        if !shortages.is_empty() {
            // Undo any decrements already applied this attempt: no partial
            // stock movement is ever observable.
            tx.rollback().await.map_err(DbError::from)?;

            debug!(
                prescription_id = %prescription_id,
                failing_lines = shortages.len(),
                "Fulfillment aborted on insufficient stock"
            );
            return Err(EngineError::InsufficientStock { shortages });
        }

        let original: Money = items.iter().map(BillItem::line_total).sum();
        let discount = original.percent_of(discount_percent);
        let final_amount = original - discount;

        let (payment_status, payment_method, paid_at) = match settlement {
            Settlement::Deferred => (PaymentStatus::Pending, None, None),
            Settlement::CashOnCounter => {
                (PaymentStatus::Paid, Some(PaymentMethod::Cash), Some(now))
            }
        };

        let bill = Bill {
            id: bill_id,
            prescription_id: prescription.id.clone(),
            patient_id: prescription.patient_id.clone(),
            appointment_id: prescription.appointment_id.clone(),
            original_cents: original.cents(),
            discount_percent: discount_percent as i64,
            discount_cents: discount.cents(),
            final_cents: final_amount.cents(),
            payment_status,
            payment_method,
            payment_transaction_id: None,
            paid_at,
            refunded_at: None,
            notes,
            generated_by: actor.id.clone(),
            created_at: now,
            updated_at: now,
        };

        match bills.insert_with_items(&mut tx, &bill, &items).await {
            Ok(()) => {}
            Err(e) if e.is_unique_violation_on("bills.prescription_id") => {
                tx.rollback().await.map_err(DbError::from)?;
                return Err(EngineError::AlreadyBilled {
                    prescription_id: prescription_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        prescriptions
            .mark_lines_administered(&mut tx, prescription_id, &actor.id, now)
            .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            bill_id = %bill.id,
            prescription_id = %prescription_id,
            final_cents = bill.final_cents,
            lines = items.len(),
            generated_by = %actor.id,
            "Fulfillment committed"
        );

        Ok(bill)
    }

    /// Resolves one line to its catalog entry on the open transaction.
    ///
    /// Explicit medicine_id wins when it resolves to an active entry; a
    /// stale reference falls back to name matching with the deterministic
    /// tie-break from rx-core.
    async fn resolve_in_tx(
        &self,
        conn: &mut SqliteConnection,
        line: &PrescriptionLine,
    ) -> EngineResult<Option<Medicine>> {
        let medicines = self.db.medicines();

        if let Some(medicine_id) = &line.medicine_id {
            if let Some(found) = medicines.get_in_tx(conn, medicine_id).await? {
                if found.is_active {
                    return Ok(Some(found));
                }
            }
        }

        let candidates = medicines.find_candidates(conn, &line.medicine_name).await?;
        Ok(pick_match(line, &candidates).cloned())
    }
}
