//! # Prescription Repository
//!
//! Database operations for prescriptions and their line items.
//!
//! Prescriptions are authored by the doctor workflow; inside this engine
//! they are read-mostly. The only mutation fulfillment performs is flipping
//! pending lines to administered, and touching the header row to open the
//! fulfillment transaction's write scope.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use rx_core::{LineStatus, Prescription, PrescriptionLine};

/// All columns of the prescription_items table, in struct order.
const LINE_COLUMNS: &str = "id, prescription_id, position, medicine_name, medicine_id, \
     dosage, frequency, duration, quantity, status, administered_at, administered_by";

/// Repository for prescription operations.
#[derive(Debug, Clone)]
pub struct PrescriptionRepository {
    pool: SqlitePool,
}

impl PrescriptionRepository {
    /// Creates a new PrescriptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PrescriptionRepository { pool }
    }

    /// Inserts a prescription with its ordered lines in one transaction.
    ///
    /// This is the doctor-workflow boundary; the engine itself never creates
    /// prescriptions.
    pub async fn insert(
        &self,
        prescription: &Prescription,
        lines: &[PrescriptionLine],
    ) -> DbResult<()> {
        debug!(id = %prescription.id, lines = lines.len(), "Inserting prescription");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO prescriptions (
                id, patient_id, doctor_id, appointment_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&prescription.id)
        .bind(&prescription.patient_id)
        .bind(&prescription.doctor_id)
        .bind(&prescription.appointment_id)
        .bind(prescription.created_at)
        .bind(prescription.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO prescription_items (
                    id, prescription_id, position, medicine_name, medicine_id,
                    dosage, frequency, duration, quantity, status,
                    administered_at, administered_by
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )
            .bind(&line.id)
            .bind(&line.prescription_id)
            .bind(line.position)
            .bind(&line.medicine_name)
            .bind(&line.medicine_id)
            .bind(&line.dosage)
            .bind(&line.frequency)
            .bind(&line.duration)
            .bind(line.quantity)
            .bind(line.status)
            .bind(line.administered_at)
            .bind(&line.administered_by)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Gets a prescription header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Prescription>> {
        let prescription = sqlx::query_as::<_, Prescription>(
            r#"
            SELECT id, patient_id, doctor_id, appointment_id, created_at, updated_at
            FROM prescriptions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prescription)
    }

    /// Gets all lines of a prescription in prescription order.
    pub async fn get_lines(&self, prescription_id: &str) -> DbResult<Vec<PrescriptionLine>> {
        let lines = sqlx::query_as::<_, PrescriptionLine>(&format!(
            r#"
            SELECT {LINE_COLUMNS}
            FROM prescription_items
            WHERE prescription_id = ?1
            ORDER BY position
            "#
        ))
        .bind(prescription_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Touches the prescription header on an open transaction.
    ///
    /// This is deliberately the FIRST statement of every fulfillment
    /// transaction: the write makes the connection take the database write
    /// lock up front, so concurrent fulfillments queue on the busy timeout
    /// instead of failing a read-to-write upgrade mid-flight. It doubles as
    /// the existence check.
    pub async fn touch(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query("UPDATE prescriptions SET updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Marks every pending line of a prescription as administered, on an
    /// open fulfillment transaction.
    ///
    /// Pending -> administered happens exactly once per line: already
    /// administered lines are left untouched, preserving their original
    /// timestamp and actor.
    pub async fn mark_lines_administered(
        &self,
        conn: &mut SqliteConnection,
        prescription_id: &str,
        administered_by: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE prescription_items
            SET status = ?2, administered_at = ?3, administered_by = ?4
            WHERE prescription_id = ?1 AND status = ?5
            "#,
        )
        .bind(prescription_id)
        .bind(LineStatus::Administered)
        .bind(now)
        .bind(administered_by)
        .bind(LineStatus::Pending)
        .execute(conn)
        .await?;

        debug!(
            prescription_id = %prescription_id,
            lines = result.rows_affected(),
            "Marked lines administered"
        );

        Ok(result.rows_affected())
    }

    /// Counts pending lines (for diagnostics and dashboards).
    pub async fn count_pending_lines(&self, prescription_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM prescription_items
            WHERE prescription_id = ?1 AND status = ?2
            "#,
        )
        .bind(prescription_id)
        .bind(LineStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Builds a prescription line with defaults, assigning ids and positions.
///
/// Convenience for the doctor-workflow boundary and tests.
pub fn new_line(
    prescription_id: &str,
    position: i64,
    medicine_name: &str,
    quantity: i64,
) -> PrescriptionLine {
    PrescriptionLine {
        id: Uuid::new_v4().to_string(),
        prescription_id: prescription_id.to_string(),
        position,
        medicine_name: medicine_name.to_string(),
        medicine_id: None,
        dosage: None,
        frequency: None,
        duration: None,
        quantity,
        status: LineStatus::Pending,
        administered_at: None,
        administered_by: None,
    }
}

/// Helper to generate a new prescription ID.
pub fn generate_prescription_id() -> String {
    Uuid::new_v4().to_string()
}
