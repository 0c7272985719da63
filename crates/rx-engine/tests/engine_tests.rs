//! Integration tests for the fulfillment engine, payment workflow, and
//! reporting aggregator, driven through the public API against a real
//! SQLite database.
//!
//! Concurrency tests use a file-backed database so multiple connections can
//! contend for the write lock; everything else runs in memory.

use chrono::Utc;

use rx_core::{
    Actor, LineStatus, Medicine, PaymentMethod, PaymentStatus, Prescription, StockAdjustmentOp,
};
use rx_db::repository::medicine::generate_medicine_id;
use rx_db::repository::prescription::{generate_prescription_id, new_line};
use rx_db::{Database, DbConfig};
use rx_engine::{
    CreateBillRequest, EngineError, FulfillmentEngine, PaymentWorkflow, ReportWindow,
    ReportingAggregator,
};

// =============================================================================
// Helpers
// =============================================================================

async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// File-backed database for tests that need real connection concurrency.
async fn file_db() -> (Database, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("rx-engine-test-{}.db", uuid::Uuid::new_v4()));
    let db = Database::new(DbConfig::new(&path)).await.unwrap();
    (db, path)
}

fn cleanup_file_db(path: &std::path::Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}

fn pharmacist() -> Actor {
    Actor::new("ph-1", "R. Shaw", "pharmacist")
}

async fn add_medicine(db: &Database, name: &str, category: &str, price: i64, stock: i64) -> String {
    let now = Utc::now();
    let medicine = Medicine {
        id: generate_medicine_id(),
        name: name.to_string(),
        category: category.to_string(),
        unit: "tablet".to_string(),
        unit_price_cents: price,
        stock_quantity: stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.medicines().insert(&medicine).await.unwrap();
    medicine.id
}

async fn add_prescription(db: &Database, patient_id: &str, lines: &[(&str, i64)]) -> String {
    let now = Utc::now();
    let id = generate_prescription_id();
    let prescription = Prescription {
        id: id.clone(),
        patient_id: patient_id.to_string(),
        doctor_id: "dr-1".to_string(),
        appointment_id: None,
        created_at: now,
        updated_at: now,
    };
    let lines: Vec<_> = lines
        .iter()
        .enumerate()
        .map(|(position, (name, quantity))| new_line(&id, position as i64, name, *quantity))
        .collect();
    db.prescriptions().insert(&prescription, &lines).await.unwrap();
    id
}

async fn stock_of(db: &Database, medicine_id: &str) -> i64 {
    db.medicines()
        .get_by_id(medicine_id)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity
}

// =============================================================================
// Fulfillment: happy path
// =============================================================================

#[tokio::test]
async fn create_bill_dispenses_and_bills_exactly() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    // Paracetamol: stock 5, unit price 2.00; prescription wants 5 at 10% off.
    let medicine_id = add_medicine(&db, "Paracetamol", "analgesic", 200, 5).await;
    let rx_id = add_prescription(&db, "pat-1", &[("Paracetamol", 5)]).await;

    let bill = engine
        .create_bill(
            &CreateBillRequest {
                prescription_id: rx_id.clone(),
                patient_id: "pat-1".to_string(),
                discount_percent: 10,
                notes: Some("counter 3".to_string()),
            },
            &pharmacist(),
        )
        .await
        .unwrap();

    assert_eq!(bill.original_cents, 1000);
    assert_eq!(bill.discount_cents, 100);
    assert_eq!(bill.final_cents, 900);
    assert_eq!(bill.discount_percent, 10);
    assert_eq!(bill.payment_status, PaymentStatus::Pending);
    assert_eq!(bill.generated_by, "ph-1");
    assert_eq!(bill.patient_id, "pat-1");

    // Stock fully consumed.
    assert_eq!(stock_of(&db, &medicine_id).await, 0);

    // Every line administered, stamped with the actor.
    let lines = db.prescriptions().get_lines(&rx_id).await.unwrap();
    assert!(lines.iter().all(|l| l.status == LineStatus::Administered));
    assert!(lines.iter().all(|l| l.administered_by.as_deref() == Some("ph-1")));
    assert!(lines.iter().all(|l| l.administered_at.is_some()));

    // Frozen items snapshot the catalog at fulfillment time.
    let items = engine.bill_items(&bill.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name_snapshot, "Paracetamol");
    assert_eq!(items[0].unit_price_cents, 200);
    assert_eq!(items[0].line_total_cents, 1000);
}

#[tokio::test]
async fn bill_items_stay_frozen_after_catalog_price_change() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    let medicine_id = add_medicine(&db, "Amoxicillin", "antibiotic", 500, 10).await;
    let rx_id = add_prescription(&db, "pat-1", &[("Amoxicillin", 2)]).await;

    let bill = engine
        .quick_process(&rx_id, 0, &pharmacist())
        .await
        .unwrap();

    // Reprice the catalog entry afterwards.
    let mut medicine = db.medicines().get_by_id(&medicine_id).await.unwrap().unwrap();
    medicine.unit_price_cents = 999;
    db.medicines().update(&medicine).await.unwrap();

    let items = engine.bill_items(&bill.id).await.unwrap();
    assert_eq!(items[0].unit_price_cents, 500);
    assert_eq!(items[0].line_total_cents, 1000);
}

#[tokio::test]
async fn quick_process_settles_cash_immediately() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    add_medicine(&db, "Cetirizine", "antihistamine", 150, 20).await;
    let rx_id = add_prescription(&db, "pat-2", &[("Cetirizine", 3)]).await;

    let bill = engine.quick_process(&rx_id, 0, &pharmacist()).await.unwrap();

    assert_eq!(bill.payment_status, PaymentStatus::Paid);
    assert_eq!(bill.payment_method, Some(PaymentMethod::Cash));
    assert!(bill.paid_at.is_some());
    assert_eq!(bill.original_cents, 450);
    assert_eq!(bill.final_cents, 450);
}

#[tokio::test]
async fn amount_identity_holds_across_discounts() {
    for discount in [0u32, 7, 33, 50, 100] {
        let db = memory_db().await;
        let engine = FulfillmentEngine::new(db.clone());

        add_medicine(&db, "Ibuprofen", "analgesic", 333, 50).await;
        let rx_id = add_prescription(&db, "pat-1", &[("Ibuprofen", 3)]).await;

        let bill = engine
            .quick_process(&rx_id, discount, &pharmacist())
            .await
            .unwrap();

        assert_eq!(bill.original_cents, 999);
        // Round-half-up at cent granularity.
        let expected_discount = (999i64 * discount as i64 + 50) / 100;
        assert_eq!(bill.discount_cents, expected_discount);
        assert_eq!(bill.final_cents, bill.original_cents - bill.discount_cents);
    }
}

// =============================================================================
// Fulfillment: rejections
// =============================================================================

#[tokio::test]
async fn depleted_stock_rejects_with_shortfall_detail() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    let medicine_id = add_medicine(&db, "Paracetamol", "analgesic", 200, 5).await;

    // First prescription takes the whole stock.
    let rx1 = add_prescription(&db, "pat-1", &[("Paracetamol", 5)]).await;
    engine.quick_process(&rx1, 0, &pharmacist()).await.unwrap();
    assert_eq!(stock_of(&db, &medicine_id).await, 0);

    // Second prescription for one unit must fail with required=1, available=0.
    let rx2 = add_prescription(&db, "pat-2", &[("Paracetamol", 1)]).await;
    let err = engine.quick_process(&rx2, 0, &pharmacist()).await.unwrap_err();

    match err {
        EngineError::InsufficientStock { shortages } => {
            assert_eq!(shortages.len(), 1);
            assert_eq!(shortages[0].requested, 1);
            assert_eq!(shortages[0].available, 0);
            assert!(shortages[0].matched);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Nothing moved: stock still 0, no bill, lines still pending.
    assert_eq!(stock_of(&db, &medicine_id).await, 0);
    assert!(engine.bill_for_prescription(&rx2).await.unwrap().is_none());
    let lines = db.prescriptions().get_lines(&rx2).await.unwrap();
    assert!(lines.iter().all(|l| l.status == LineStatus::Pending));
}

#[tokio::test]
async fn partial_availability_fails_whole_prescription() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    let in_stock = add_medicine(&db, "Cetirizine", "antihistamine", 150, 20).await;
    let short = add_medicine(&db, "Amoxicillin", "antibiotic", 500, 1).await;

    let rx_id =
        add_prescription(&db, "pat-1", &[("Cetirizine", 2), ("Amoxicillin", 3)]).await;

    let err = engine.quick_process(&rx_id, 0, &pharmacist()).await.unwrap_err();

    match err {
        EngineError::InsufficientStock { shortages } => {
            assert_eq!(shortages.len(), 1);
            assert_eq!(shortages[0].medicine_name, "Amoxicillin");
            assert_eq!(shortages[0].requested, 3);
            assert_eq!(shortages[0].available, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // The available line's stock is untouched: zero decrements happened.
    assert_eq!(stock_of(&db, &in_stock).await, 20);
    assert_eq!(stock_of(&db, &short).await, 1);
    assert!(engine.bill_for_prescription(&rx_id).await.unwrap().is_none());
}

#[tokio::test]
async fn unmatched_medicine_reports_as_shortage() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    add_medicine(&db, "Paracetamol", "analgesic", 200, 50).await;
    let rx_id = add_prescription(&db, "pat-1", &[("Warfarin", 1)]).await;

    let err = engine.quick_process(&rx_id, 0, &pharmacist()).await.unwrap_err();
    match err {
        EngineError::InsufficientStock { shortages } => {
            assert_eq!(shortages.len(), 1);
            assert!(!shortages[0].matched);
            assert_eq!(shortages[0].available, 0);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
}

#[tokio::test]
async fn second_fulfillment_is_rejected_as_already_billed() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    let medicine_id = add_medicine(&db, "Paracetamol", "analgesic", 200, 50).await;
    let rx_id = add_prescription(&db, "pat-1", &[("Paracetamol", 2)]).await;

    let request = CreateBillRequest {
        prescription_id: rx_id.clone(),
        patient_id: "pat-1".to_string(),
        discount_percent: 0,
        notes: None,
    };

    engine.create_bill(&request, &pharmacist()).await.unwrap();
    let err = engine.create_bill(&request, &pharmacist()).await.unwrap_err();

    assert!(matches!(err, EngineError::AlreadyBilled { .. }));
    assert!(err.is_client_error());

    // Only the first fulfillment decremented.
    assert_eq!(stock_of(&db, &medicine_id).await, 48);
}

#[tokio::test]
async fn patient_mismatch_is_rejected_before_any_effect() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    let medicine_id = add_medicine(&db, "Paracetamol", "analgesic", 200, 50).await;
    let rx_id = add_prescription(&db, "pat-1", &[("Paracetamol", 2)]).await;

    let err = engine
        .create_bill(
            &CreateBillRequest {
                prescription_id: rx_id.clone(),
                patient_id: "someone-else".to_string(),
                discount_percent: 0,
                notes: None,
            },
            &pharmacist(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::PatientMismatch { .. }));
    assert_eq!(stock_of(&db, &medicine_id).await, 50);
    assert!(engine.bill_for_prescription(&rx_id).await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_discount_is_rejected_upfront() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    add_medicine(&db, "Paracetamol", "analgesic", 200, 50).await;
    let rx_id = add_prescription(&db, "pat-1", &[("Paracetamol", 1)]).await;

    let err = engine.quick_process(&rx_id, 101, &pharmacist()).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn unknown_prescription_is_not_found() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    let err = engine
        .quick_process("no-such-rx", 0, &pharmacist())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

// =============================================================================
// Availability preview
// =============================================================================

#[tokio::test]
async fn preview_is_read_only_and_repeatable() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    let medicine_id = add_medicine(&db, "Paracetamol 500mg", "analgesic", 200, 5).await;
    add_medicine(&db, "Calpol", "analgesic", 150, 50).await;
    let rx_id = add_prescription(&db, "pat-1", &[("paracetamol", 3)]).await;

    let first = engine.preview_availability(&rx_id).await.unwrap();
    let second = engine.preview_availability(&rx_id).await.unwrap();

    assert!(first.all_available);
    assert_eq!(first.estimated_total_cents, 600);
    assert_eq!(first.total_lines, 1);
    assert_eq!(first.pending_lines, 1);
    assert_eq!(
        first.lines[0].matched.as_ref().unwrap().medicine_id,
        medicine_id
    );
    assert_eq!(first.estimated_total_cents, second.estimated_total_cents);

    // Previewing never moved stock.
    assert_eq!(stock_of(&db, &medicine_id).await, 5);
}

#[tokio::test]
async fn preview_offers_substitutes_when_short() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    add_medicine(&db, "Paracetamol", "analgesic", 200, 2).await;
    let substitute_id = add_medicine(&db, "Calpol", "analgesic", 150, 50).await;
    let rx_id = add_prescription(&db, "pat-1", &[("Paracetamol", 5)]).await;

    let report = engine.preview_availability(&rx_id).await.unwrap();

    assert!(!report.all_available);
    assert!(!report.lines[0].available);
    assert_eq!(report.lines[0].substitutes.len(), 1);
    assert_eq!(report.lines[0].substitutes[0].medicine_id, substitute_id);
}

// =============================================================================
// Concurrency properties
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fulfillments_never_oversell() {
    let (db, path) = file_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    // Stock 5; four prescriptions of 2 units each: only two can succeed.
    let medicine_id = add_medicine(&db, "Paracetamol", "analgesic", 200, 5).await;

    let mut rx_ids = Vec::new();
    for i in 0..4 {
        rx_ids.push(add_prescription(&db, &format!("pat-{i}"), &[("Paracetamol", 2)]).await);
    }

    let mut handles = Vec::new();
    for rx_id in rx_ids {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.quick_process(&rx_id, 0, &pharmacist()).await
        }));
    }

    let mut successes = 0i64;
    let mut shortfalls = 0i64;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(EngineError::InsufficientStock { .. }) => shortfalls += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, 2);
    assert_eq!(shortfalls, 2);

    // Total decrements never exceed starting stock.
    assert_eq!(stock_of(&db, &medicine_id).await, 5 - 2 * successes);

    db.close().await;
    cleanup_file_db(&path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fulfillments_bill_once() {
    let (db, path) = file_db().await;
    let engine = FulfillmentEngine::new(db.clone());

    add_medicine(&db, "Paracetamol", "analgesic", 200, 100).await;
    let rx_id = add_prescription(&db, "pat-1", &[("Paracetamol", 2)]).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = engine.clone();
        let rx_id = rx_id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .create_bill(
                    &CreateBillRequest {
                        prescription_id: rx_id,
                        patient_id: "pat-1".to_string(),
                        discount_percent: 0,
                        notes: None,
                    },
                    &pharmacist(),
                )
                .await
        }));
    }

    let mut successes = 0;
    let mut already_billed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(EngineError::AlreadyBilled { .. }) => already_billed += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(already_billed, 3);
    assert_eq!(db.bills().count().await.unwrap(), 1);

    db.close().await;
    cleanup_file_db(&path);
}

// =============================================================================
// Payment lifecycle
// =============================================================================

#[tokio::test]
async fn marking_paid_is_idempotent() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());
    let payments = PaymentWorkflow::new(db.clone());

    add_medicine(&db, "Paracetamol", "analgesic", 200, 50).await;
    let rx_id = add_prescription(&db, "pat-1", &[("Paracetamol", 2)]).await;
    let bill = engine
        .create_bill(
            &CreateBillRequest {
                prescription_id: rx_id,
                patient_id: "pat-1".to_string(),
                discount_percent: 0,
                notes: None,
            },
            &pharmacist(),
        )
        .await
        .unwrap();

    let first = payments
        .update_payment_status(
            &bill.id,
            PaymentStatus::Paid,
            Some(PaymentMethod::Card),
            Some("txn-77"),
        )
        .await
        .unwrap();
    assert_eq!(first.payment_status, PaymentStatus::Paid);
    assert_eq!(first.payment_method, Some(PaymentMethod::Card));
    assert_eq!(first.payment_transaction_id.as_deref(), Some("txn-77"));
    assert!(first.paid_at.is_some());

    // Second submission: no-op success with identical final state.
    let second = payments
        .update_payment_status(
            &bill.id,
            PaymentStatus::Paid,
            Some(PaymentMethod::Card),
            Some("txn-77"),
        )
        .await
        .unwrap();
    assert_eq!(second.payment_status, PaymentStatus::Paid);
    assert_eq!(second.paid_at, first.paid_at);
}

#[tokio::test]
async fn paid_cannot_revert_to_pending() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());
    let payments = PaymentWorkflow::new(db.clone());

    add_medicine(&db, "Paracetamol", "analgesic", 200, 50).await;
    let rx_id = add_prescription(&db, "pat-1", &[("Paracetamol", 1)]).await;
    let bill = engine.quick_process(&rx_id, 0, &pharmacist()).await.unwrap();
    assert_eq!(bill.payment_status, PaymentStatus::Paid);

    let err = payments
        .update_payment_status(&bill.id, PaymentStatus::Pending, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn refund_flows_only_from_paid() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());
    let payments = PaymentWorkflow::new(db.clone());

    add_medicine(&db, "Paracetamol", "analgesic", 200, 50).await;

    // Pending bill cannot be refunded.
    let rx1 = add_prescription(&db, "pat-1", &[("Paracetamol", 1)]).await;
    let pending_bill = engine
        .create_bill(
            &CreateBillRequest {
                prescription_id: rx1,
                patient_id: "pat-1".to_string(),
                discount_percent: 0,
                notes: None,
            },
            &pharmacist(),
        )
        .await
        .unwrap();
    let err = payments
        .update_payment_status(&pending_bill.id, PaymentStatus::Refunded, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    // Paid bill refunds with its own audit timestamp.
    let rx2 = add_prescription(&db, "pat-2", &[("Paracetamol", 1)]).await;
    let paid_bill = engine.quick_process(&rx2, 0, &pharmacist()).await.unwrap();
    let refunded = payments
        .update_payment_status(&paid_bill.id, PaymentStatus::Refunded, None, Some("rev-9"))
        .await
        .unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    assert!(refunded.refunded_at.is_some());
    assert!(refunded.paid_at.is_some());

    // Payment workflow never touches stock.
    let medicine = db.medicines().search("Paracetamol", 1).await.unwrap();
    assert_eq!(medicine[0].stock_quantity, 48);
}

// =============================================================================
// Reporting
// =============================================================================

#[tokio::test]
async fn sales_report_folds_revenue_split_and_rankings() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());
    let reports = ReportingAggregator::new(db.clone());

    add_medicine(&db, "Paracetamol", "analgesic", 200, 100).await;
    add_medicine(&db, "Amoxicillin", "antibiotic", 500, 100).await;

    // One paid cash bill: 3 × 2.00 = 6.00
    let rx1 = add_prescription(&db, "pat-1", &[("Paracetamol", 3)]).await;
    engine.quick_process(&rx1, 0, &pharmacist()).await.unwrap();

    // One pending bill: 2 × 5.00 = 10.00, 10% off = 9.00
    let rx2 = add_prescription(&db, "pat-2", &[("Amoxicillin", 2)]).await;
    engine
        .create_bill(
            &CreateBillRequest {
                prescription_id: rx2,
                patient_id: "pat-2".to_string(),
                discount_percent: 10,
                notes: None,
            },
            &pharmacist(),
        )
        .await
        .unwrap();

    let summary = reports.sales_report(&ReportWindow::Today).await.unwrap();

    assert_eq!(summary.total_bills, 2);
    assert_eq!(summary.total_revenue_cents, 600 + 900);
    assert_eq!(summary.paid_revenue_cents, 600);
    assert_eq!(summary.pending_revenue_cents, 900);
    assert_eq!(summary.refunded_revenue_cents, 0);

    // Today's window renders a single daily entry carrying both bills.
    assert_eq!(summary.daily.len(), 1);
    assert_eq!(summary.daily[0].bill_count, 2);
    assert_eq!(summary.daily[0].revenue_cents, 1500);

    // Ranked by pre-discount item revenue: Amoxicillin 10.00 > Paracetamol 6.00.
    assert_eq!(summary.top_medicines.len(), 2);
    assert_eq!(summary.top_medicines[0].name, "Amoxicillin");
    assert_eq!(summary.top_medicines[0].revenue_cents, 1000);
    assert_eq!(summary.top_medicines[0].bill_count, 1);
    assert_eq!(summary.top_medicines[1].name, "Paracetamol");
    assert_eq!(summary.top_medicines[1].total_quantity, 3);
}

#[tokio::test]
async fn empty_window_yields_zero_filled_series() {
    let db = memory_db().await;
    let reports = ReportingAggregator::new(db.clone());

    let now = Utc::now();
    let window = ReportWindow::Custom {
        from: now - chrono::Duration::days(2),
        to: now,
    };

    let summary = reports.sales_report(&window).await.unwrap();

    assert_eq!(summary.total_bills, 0);
    assert_eq!(summary.total_revenue_cents, 0);
    assert_eq!(summary.daily.len(), 3);
    assert!(summary.daily.iter().all(|d| d.revenue_cents == 0 && d.bill_count == 0));
    assert!(summary.top_medicines.is_empty());
}

#[tokio::test]
async fn inventory_report_buckets_and_dispensed_rollup() {
    let db = memory_db().await;
    let engine = FulfillmentEngine::new(db.clone());
    let reports = ReportingAggregator::new(db.clone());

    add_medicine(&db, "Paracetamol", "analgesic", 200, 5).await; // critical
    add_medicine(&db, "Cetirizine", "antihistamine", 150, 30).await; // low
    add_medicine(&db, "Amoxicillin", "antibiotic", 500, 60).await; // normal
    add_medicine(&db, "Vitamin D3", "supplement", 100, 200).await; // high

    let rx_id = add_prescription(&db, "pat-1", &[("Cetirizine", 4)]).await;
    engine.quick_process(&rx_id, 0, &pharmacist()).await.unwrap();

    let summary = reports
        .inventory_report(Some(&ReportWindow::Today))
        .await
        .unwrap();

    assert_eq!(summary.total_medicines, 4);
    assert_eq!(summary.buckets.len(), 4);

    // Dispensing 4 moved Cetirizine from 30 to 26: still the low bucket.
    let counts: Vec<u32> = summary.buckets.iter().map(|b| b.medicine_count).collect();
    assert_eq!(counts, vec![1, 1, 1, 1]);

    let critical = &summary.buckets[0];
    assert_eq!(critical.total_units, 5);
    assert_eq!(critical.stock_value_cents, 1000);

    let dispensed = summary.dispensed.unwrap();
    assert_eq!(dispensed.total_units, 4);
    assert_eq!(dispensed.revenue_cents, 600);

    assert_eq!(
        summary.total_units,
        5 + 26 + 60 + 200
    );
}

#[tokio::test]
async fn reports_serialize_with_camel_case_keys() {
    let db = memory_db().await;
    let reports = ReportingAggregator::new(db.clone());

    let summary = reports.inventory_report(None).await.unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert!(json.get("totalStockValueCents").is_some());
    assert!(json.get("buckets").is_some());
    assert!(json.get("dispensed").unwrap().is_null());
}

// =============================================================================
// Catalog boundary: administrative stock adjustment
// =============================================================================

#[tokio::test]
async fn stock_adjustments_apply_and_audit() {
    let db = memory_db().await;

    let medicine_id = add_medicine(&db, "Paracetamol", "analgesic", 200, 10).await;

    let after_add = db
        .medicines()
        .adjust_stock(&medicine_id, StockAdjustmentOp::Add, 40, "monthly restock", "inv-1")
        .await
        .unwrap();
    assert_eq!(after_add.stock_quantity, 50);

    let after_set = db
        .medicines()
        .adjust_stock(&medicine_id, StockAdjustmentOp::Set, 20, "cycle count", "inv-1")
        .await
        .unwrap();
    assert_eq!(after_set.stock_quantity, 20);

    let after_subtract = db
        .medicines()
        .adjust_stock(&medicine_id, StockAdjustmentOp::Subtract, 5, "damaged strip", "inv-1")
        .await
        .unwrap();
    assert_eq!(after_subtract.stock_quantity, 15);

    // Subtracting below zero is rejected and leaves stock untouched.
    let err = db
        .medicines()
        .adjust_stock(&medicine_id, StockAdjustmentOp::Subtract, 100, "oops", "inv-1")
        .await
        .unwrap_err();
    assert!(matches!(err, rx_db::DbError::CheckViolation { .. }));
    assert_eq!(stock_of(&db, &medicine_id).await, 15);

    let audit = db.medicines().adjustments_for(&medicine_id).await.unwrap();
    assert_eq!(audit.len(), 3);
    assert!(audit.iter().all(|a| a.adjusted_by == "inv-1"));
}
