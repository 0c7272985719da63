//! # Reporting Aggregator
//!
//! Read-only, time-windowed rollups for the pharmacy dashboards: per-day
//! sales, payment split, top medicines, and stock-level buckets.
//!
//! Everything here is derived on demand from the current stores with an
//! in-process fold; the aggregator holds no state of its own. It takes no
//! locks and may run concurrently with fulfillment writes; results are a
//! point-in-time snapshot. An empty window yields zero-filled structures,
//! never an error.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use rx_core::{PaymentStatus, StockLevel, ValidationError};
use rx_db::Database;

use crate::error::{EngineError, EngineResult};

/// How many medicines the sales report ranks.
pub const TOP_MEDICINES_LIMIT: usize = 10;

// =============================================================================
// Report Window
// =============================================================================

/// Time window for report queries, resolved against the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReportWindow {
    /// Start of the current UTC day to now.
    Today,
    /// Rolling last 7 days.
    Week,
    /// Rolling last 30 days.
    Month,
    /// Rolling last 365 days.
    Year,
    /// Caller-supplied half-open range [from, to).
    Custom {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

impl ReportWindow {
    /// Resolves the window to a concrete [from, to) range.
    pub fn resolve(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            ReportWindow::Today => {
                let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
                (start, now)
            }
            ReportWindow::Week => (now - chrono::Duration::days(7), now),
            ReportWindow::Month => (now - chrono::Duration::days(30), now),
            ReportWindow::Year => (now - chrono::Duration::days(365), now),
            ReportWindow::Custom { from, to } => (*from, *to),
        }
    }
}

// =============================================================================
// Report Structures
// =============================================================================

/// One day of the sales series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    pub date: NaiveDate,
    pub revenue_cents: i64,
    pub bill_count: u32,
}

/// One medicine's ranking entry, computed from frozen bill items. Revenue
/// is pre-discount (discounts apply to whole bills, not lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopMedicine {
    pub medicine_id: String,
    pub name: String,
    /// Number of distinct bills containing the medicine.
    pub bill_count: u32,
    pub total_quantity: i64,
    pub revenue_cents: i64,
}

/// Sales rollup over a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,

    pub total_bills: u32,
    /// Sum of final amounts of all bills in the window.
    pub total_revenue_cents: i64,

    /// Zero-filled per-day series across the whole window.
    pub daily: Vec<DailySales>,

    /// Payment-status revenue split.
    pub paid_revenue_cents: i64,
    pub pending_revenue_cents: i64,
    pub refunded_revenue_cents: i64,

    /// Top medicines by revenue, then quantity.
    pub top_medicines: Vec<TopMedicine>,
}

/// One stock-level bucket of the inventory report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockBucket {
    pub level: StockLevel,
    pub medicine_count: u32,
    pub total_units: i64,
    /// stock × unit price, summed over the bucket.
    pub stock_value_cents: i64,
}

/// Dispensed totals over a window, from frozen bill items (pre-discount).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispensedSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_units: i64,
    pub revenue_cents: i64,
}

/// Inventory rollup: point-in-time stock buckets, plus dispensed totals
/// when a window was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    /// Always all four buckets, zero-filled, in ascending stock order.
    pub buckets: Vec<StockBucket>,
    pub total_medicines: u32,
    pub total_units: i64,
    pub total_stock_value_cents: i64,
    pub dispensed: Option<DispensedSummary>,
}

// =============================================================================
// Aggregator
// =============================================================================

/// Read-side aggregator over the bill, prescription, and medicine stores.
#[derive(Debug, Clone)]
pub struct ReportingAggregator {
    db: Database,
}

impl ReportingAggregator {
    /// Creates a new aggregator over the given database.
    pub fn new(db: Database) -> Self {
        ReportingAggregator { db }
    }

    /// Computes the sales rollup for a window.
    pub async fn sales_report(&self, window: &ReportWindow) -> EngineResult<SalesSummary> {
        let (from, to) = window.resolve(Utc::now());
        validate_range(from, to)?;

        let bills = self.db.bills().list_between(from, to).await?;
        let items = self.db.bills().items_between(from, to).await?;

        debug!(bills = bills.len(), items = items.len(), "Folding sales report");

        // Zero-filled daily series across the window.
        let mut daily: BTreeMap<NaiveDate, DailySales> = dates_in_range(from, to)
            .into_iter()
            .map(|date| {
                (
                    date,
                    DailySales {
                        date,
                        revenue_cents: 0,
                        bill_count: 0,
                    },
                )
            })
            .collect();

        let mut total_revenue_cents = 0i64;
        let mut paid = 0i64;
        let mut pending = 0i64;
        let mut refunded = 0i64;

        for bill in &bills {
            total_revenue_cents += bill.final_cents;
            match bill.payment_status {
                PaymentStatus::Paid => paid += bill.final_cents,
                PaymentStatus::Pending => pending += bill.final_cents,
                PaymentStatus::Refunded => refunded += bill.final_cents,
            }

            let entry = daily
                .entry(bill.created_at.date_naive())
                .or_insert_with(|| DailySales {
                    date: bill.created_at.date_naive(),
                    revenue_cents: 0,
                    bill_count: 0,
                });
            entry.revenue_cents += bill.final_cents;
            entry.bill_count += 1;
        }

        // Top medicines from frozen bill items, grouped by catalog id.
        struct Accum {
            name: String,
            bills: HashSet<String>,
            quantity: i64,
            revenue_cents: i64,
        }

        let mut by_medicine: HashMap<String, Accum> = HashMap::new();
        for item in &items {
            let entry = by_medicine
                .entry(item.medicine_id.clone())
                .or_insert_with(|| Accum {
                    name: item.name_snapshot.clone(),
                    bills: HashSet::new(),
                    quantity: 0,
                    revenue_cents: 0,
                });
            entry.bills.insert(item.bill_id.clone());
            entry.quantity += item.quantity;
            entry.revenue_cents += item.line_total_cents;
        }

        let mut top_medicines: Vec<TopMedicine> = by_medicine
            .into_iter()
            .map(|(medicine_id, accum)| TopMedicine {
                medicine_id,
                name: accum.name,
                bill_count: accum.bills.len() as u32,
                total_quantity: accum.quantity,
                revenue_cents: accum.revenue_cents,
            })
            .collect();
        top_medicines.sort_by(|a, b| {
            b.revenue_cents
                .cmp(&a.revenue_cents)
                .then(b.total_quantity.cmp(&a.total_quantity))
                .then(a.name.cmp(&b.name))
        });
        top_medicines.truncate(TOP_MEDICINES_LIMIT);

        Ok(SalesSummary {
            from,
            to,
            total_bills: bills.len() as u32,
            total_revenue_cents,
            daily: daily.into_values().collect(),
            paid_revenue_cents: paid,
            pending_revenue_cents: pending,
            refunded_revenue_cents: refunded,
            top_medicines,
        })
    }

    /// Computes the inventory rollup. Stock buckets are always point in
    /// time; a window adds dispensed totals over that range.
    pub async fn inventory_report(
        &self,
        window: Option<&ReportWindow>,
    ) -> EngineResult<InventorySummary> {
        let catalog = self.db.medicines().list_active(None).await?;

        let mut per_level: HashMap<StockLevel, StockBucket> = HashMap::new();
        let mut total_units = 0i64;
        let mut total_value = 0i64;

        for medicine in &catalog {
            let value = medicine.unit_price_cents * medicine.stock_quantity;
            total_units += medicine.stock_quantity;
            total_value += value;

            let level = StockLevel::from_units(medicine.stock_quantity);
            let bucket = per_level.entry(level).or_insert_with(|| StockBucket {
                level,
                medicine_count: 0,
                total_units: 0,
                stock_value_cents: 0,
            });
            bucket.medicine_count += 1;
            bucket.total_units += medicine.stock_quantity;
            bucket.stock_value_cents += value;
        }

        let buckets = StockLevel::ALL
            .into_iter()
            .map(|level| {
                per_level.remove(&level).unwrap_or(StockBucket {
                    level,
                    medicine_count: 0,
                    total_units: 0,
                    stock_value_cents: 0,
                })
            })
            .collect();

        let dispensed = match window {
            Some(window) => {
                let (from, to) = window.resolve(Utc::now());
                validate_range(from, to)?;

                let items = self.db.bills().items_between(from, to).await?;
                Some(DispensedSummary {
                    from,
                    to,
                    total_units: items.iter().map(|i| i.quantity).sum(),
                    revenue_cents: items.iter().map(|i| i.line_total_cents).sum(),
                })
            }
            None => None,
        };

        Ok(InventorySummary {
            buckets,
            total_medicines: catalog.len() as u32,
            total_units,
            total_stock_value_cents: total_value,
            dispensed,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_range(from: DateTime<Utc>, to: DateTime<Utc>) -> EngineResult<()> {
    if from > to {
        return Err(EngineError::InvalidInput(ValidationError::InvalidValue {
            field: "window".to_string(),
            reason: "from is after to".to_string(),
        }));
    }
    Ok(())
}

/// Every calendar date covered by [from, to), inclusive of the day `to`
/// falls on (a half-open range still renders its last partial day).
fn dates_in_range(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut date = from.date_naive();
    let last = to.date_naive();

    while date <= last {
        dates.push(date);
        match date.checked_add_days(Days::new(1)) {
            Some(next) => date = next,
            None => break,
        }
    }

    dates
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_today_window_starts_at_midnight() {
        let now = at(2026, 3, 15, 14);
        let (from, to) = ReportWindow::Today.resolve(now);
        assert_eq!(from, at(2026, 3, 15, 0));
        assert_eq!(to, now);
    }

    #[test]
    fn test_rolling_windows() {
        let now = at(2026, 3, 15, 14);

        let (from, _) = ReportWindow::Week.resolve(now);
        assert_eq!(from, at(2026, 3, 8, 14));

        let (from, _) = ReportWindow::Month.resolve(now);
        assert_eq!(from, at(2026, 2, 13, 14));

        let (from, _) = ReportWindow::Year.resolve(now);
        assert_eq!(from, at(2025, 3, 15, 14));
    }

    #[test]
    fn test_custom_window_passthrough() {
        let from = at(2026, 1, 1, 0);
        let to = at(2026, 1, 31, 0);
        assert_eq!(ReportWindow::Custom { from, to }.resolve(Utc::now()), (from, to));
    }

    #[test]
    fn test_dates_in_range_spans_partial_days() {
        let dates = dates_in_range(at(2026, 3, 14, 22), at(2026, 3, 16, 2));
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 16).unwrap(),
            ]
        );
    }

    #[test]
    fn test_dates_in_range_single_day() {
        let dates = dates_in_range(at(2026, 3, 14, 0), at(2026, 3, 14, 23));
        assert_eq!(dates.len(), 1);
    }

    #[test]
    fn test_validate_range_rejects_inverted() {
        assert!(validate_range(at(2026, 3, 15, 0), at(2026, 3, 14, 0)).is_err());
        assert!(validate_range(at(2026, 3, 14, 0), at(2026, 3, 14, 0)).is_ok());
    }
}
