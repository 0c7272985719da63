//! # Availability Resolution
//!
//! Pure logic for matching prescription lines against the medicine catalog
//! and computing per-line availability, estimated cost, and substitutes.
//!
//! ## Matching Rules
//! A prescription line resolves to a catalog entry by:
//! 1. Explicit `medicine_id` reference, when present and active
//! 2. Case-insensitive substring match on the catalog name, with a
//!    deterministic tie-break when several entries match:
//!    exact name > shortest name > lowest id
//!
//! The tie-break makes repeated calls return the same pick, so a preview and
//! the fulfillment that follows it resolve identically against the same
//! catalog.
//!
//! Everything in this module is side-effect-free; the resolver never mutates
//! stock or prescription state and is safe to call any number of times.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{LineStatus, Medicine, PrescriptionLine};
use crate::MAX_SUBSTITUTES;

// =============================================================================
// View Types (derived, never persisted)
// =============================================================================

/// Catalog data for a matched line, snapshotted into the view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedMedicine {
    pub medicine_id: String,
    pub name: String,
    pub unit: String,
    pub unit_price_cents: i64,
    pub stock_quantity: i64,
}

/// A same-category alternative offered when a line is unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstituteSuggestion {
    pub medicine_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub stock_quantity: i64,
}

/// Availability of one prescription line against the current catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAvailability {
    pub position: i64,
    pub medicine_name: String,
    pub requested_quantity: i64,
    pub status: LineStatus,

    /// The deterministically-picked catalog entry, if any matched.
    pub matched: Option<MatchedMedicine>,

    /// True iff a match exists with stock >= requested quantity.
    pub available: bool,

    /// unit price × quantity for the matched entry; 0 when unmatched.
    pub estimated_cost_cents: i64,

    /// Up to [`MAX_SUBSTITUTES`] in-stock same-category alternatives,
    /// populated only when the line is unavailable.
    pub substitutes: Vec<SubstituteSuggestion>,
}

/// Aggregate availability for a whole prescription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub prescription_id: String,
    pub lines: Vec<LineAvailability>,
    pub total_lines: usize,
    pub pending_lines: usize,
    pub estimated_total_cents: i64,

    /// True iff every line resolves to an available match.
    pub all_available: bool,
}

// =============================================================================
// Matching
// =============================================================================

/// Case-insensitive substring test: does the catalog `name` contain the
/// requested text?
pub fn name_matches(requested: &str, name: &str) -> bool {
    let requested = requested.trim().to_lowercase();
    if requested.is_empty() {
        return false;
    }
    name.to_lowercase().contains(&requested)
}

/// Picks the catalog entry for a prescription line.
///
/// An explicit `medicine_id` on the line wins when it resolves to an active
/// entry. Otherwise all active entries whose name contains the requested
/// text (case-insensitive) are candidates, tie-broken by:
/// exact name match, then shortest name, then lowest id.
pub fn pick_match<'a>(line: &PrescriptionLine, catalog: &'a [Medicine]) -> Option<&'a Medicine> {
    if let Some(id) = &line.medicine_id {
        if let Some(found) = catalog.iter().find(|m| m.is_active && &m.id == id) {
            return Some(found);
        }
        // Stale reference: fall through to name matching.
    }

    let requested = line.medicine_name.trim();

    catalog
        .iter()
        .filter(|m| m.is_active && name_matches(requested, &m.name))
        .min_by(|a, b| {
            let a_exact = a.name.eq_ignore_ascii_case(requested);
            let b_exact = b.name.eq_ignore_ascii_case(requested);
            b_exact
                .cmp(&a_exact)
                .then(a.name.len().cmp(&b.name.len()))
                .then(a.id.cmp(&b.id))
        })
}

/// Suggests up to [`MAX_SUBSTITUTES`] same-category alternatives that can
/// cover the requested quantity, in deterministic order (lowest price, then
/// name, then id).
pub fn suggest_substitutes<'a>(
    category: &str,
    quantity: i64,
    exclude_id: &str,
    catalog: &'a [Medicine],
) -> Vec<&'a Medicine> {
    let mut candidates: Vec<&Medicine> = catalog
        .iter()
        .filter(|m| {
            m.is_active
                && m.id != exclude_id
                && m.category.eq_ignore_ascii_case(category)
                && m.covers(quantity)
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.unit_price_cents
            .cmp(&b.unit_price_cents)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates.truncate(MAX_SUBSTITUTES);
    candidates
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves one line against the catalog.
pub fn resolve_line(line: &PrescriptionLine, catalog: &[Medicine]) -> LineAvailability {
    let matched = pick_match(line, catalog);

    let (available, estimated_cost_cents, substitutes) = match matched {
        Some(medicine) => {
            let available = medicine.covers(line.quantity);
            let cost = medicine.unit_price().multiply_quantity(line.quantity);
            let substitutes = if available {
                Vec::new()
            } else {
                suggest_substitutes(&medicine.category, line.quantity, &medicine.id, catalog)
                    .into_iter()
                    .map(|m| SubstituteSuggestion {
                        medicine_id: m.id.clone(),
                        name: m.name.clone(),
                        unit_price_cents: m.unit_price_cents,
                        stock_quantity: m.stock_quantity,
                    })
                    .collect()
            };
            (available, cost.cents(), substitutes)
        }
        None => (false, 0, Vec::new()),
    };

    LineAvailability {
        position: line.position,
        medicine_name: line.medicine_name.clone(),
        requested_quantity: line.quantity,
        status: line.status,
        matched: matched.map(|m| MatchedMedicine {
            medicine_id: m.id.clone(),
            name: m.name.clone(),
            unit: m.unit.clone(),
            unit_price_cents: m.unit_price_cents,
            stock_quantity: m.stock_quantity,
        }),
        available,
        estimated_cost_cents,
        substitutes,
    }
}

/// Resolves every line of a prescription and computes the aggregate.
pub fn resolve_lines(
    prescription_id: &str,
    lines: &[PrescriptionLine],
    catalog: &[Medicine],
) -> AvailabilityReport {
    let resolved: Vec<LineAvailability> =
        lines.iter().map(|line| resolve_line(line, catalog)).collect();

    let pending_lines = resolved
        .iter()
        .filter(|l| l.status == LineStatus::Pending)
        .count();
    let estimated_total: Money = resolved
        .iter()
        .map(|l| Money::from_cents(l.estimated_cost_cents))
        .sum();
    let all_available = !resolved.is_empty() && resolved.iter().all(|l| l.available);

    AvailabilityReport {
        prescription_id: prescription_id.to_string(),
        total_lines: resolved.len(),
        pending_lines,
        estimated_total_cents: estimated_total.cents(),
        all_available,
        lines: resolved,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn medicine(id: &str, name: &str, category: &str, price: i64, stock: i64) -> Medicine {
        Medicine {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            unit: "tablet".to_string(),
            unit_price_cents: price,
            stock_quantity: stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(name: &str, quantity: i64) -> PrescriptionLine {
        PrescriptionLine {
            id: "l1".to_string(),
            prescription_id: "rx1".to_string(),
            position: 0,
            medicine_name: name.to_string(),
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

    #[test]
    fn test_name_matches_is_case_insensitive_substring() {
        assert!(name_matches("paracetamol", "Paracetamol 500mg"));
        assert!(name_matches("PARA", "Paracetamol 500mg"));
        assert!(!name_matches("ibuprofen", "Paracetamol 500mg"));
        assert!(!name_matches("", "Paracetamol"));
        assert!(!name_matches("   ", "Paracetamol"));
    }

    #[test]
    fn test_pick_match_prefers_exact_name() {
        let catalog = vec![
            medicine("m2", "Paracetamol 500mg", "analgesic", 250, 10),
            medicine("m1", "Paracetamol", "analgesic", 200, 10),
        ];

        let picked = pick_match(&line("paracetamol", 1), &catalog).unwrap();
        assert_eq!(picked.id, "m1");
    }

    #[test]
    fn test_pick_match_prefers_shortest_name_then_lowest_id() {
        let catalog = vec![
            medicine("m3", "Amoxicillin 500mg Forte", "antibiotic", 300, 10),
            medicine("m2", "Amoxicillin 500mg", "antibiotic", 280, 10),
            medicine("m1", "Amoxicillin 250mg", "antibiotic", 250, 10),
        ];

        // No exact match; "Amoxicillin 500mg" and "Amoxicillin 250mg" tie on
        // length, so the lower id wins.
        let picked = pick_match(&line("amoxicillin", 1), &catalog).unwrap();
        assert_eq!(picked.id, "m1");
    }

    #[test]
    fn test_pick_match_is_deterministic_across_catalog_order() {
        let mut catalog = vec![
            medicine("m2", "Cetirizine 10mg", "antihistamine", 150, 5),
            medicine("m1", "Cetirizine", "antihistamine", 120, 5),
        ];

        let first = pick_match(&line("cetirizine", 1), &catalog).unwrap().id.clone();
        catalog.reverse();
        let second = pick_match(&line("cetirizine", 1), &catalog).unwrap().id.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_pick_match_explicit_id_wins_over_name() {
        let catalog = vec![
            medicine("m1", "Paracetamol", "analgesic", 200, 10),
            medicine("m2", "Ibuprofen", "analgesic", 300, 10),
        ];

        let mut l = line("paracetamol", 1);
        l.medicine_id = Some("m2".to_string());

        let picked = pick_match(&l, &catalog).unwrap();
        assert_eq!(picked.id, "m2");
    }

    #[test]
    fn test_pick_match_stale_id_falls_back_to_name() {
        let catalog = vec![medicine("m1", "Paracetamol", "analgesic", 200, 10)];

        let mut l = line("paracetamol", 1);
        l.medicine_id = Some("gone".to_string());

        let picked = pick_match(&l, &catalog).unwrap();
        assert_eq!(picked.id, "m1");
    }

    #[test]
    fn test_pick_match_ignores_inactive() {
        let mut retired = medicine("m1", "Paracetamol", "analgesic", 200, 10);
        retired.is_active = false;
        let catalog = vec![retired];

        assert!(pick_match(&line("paracetamol", 1), &catalog).is_none());
    }

    #[test]
    fn test_substitutes_capped_and_ordered() {
        let catalog = vec![
            medicine("m1", "Dolo 650", "analgesic", 300, 50),
            medicine("m2", "Calpol", "analgesic", 150, 50),
            medicine("m3", "Crocin", "analgesic", 150, 50),
            medicine("m4", "Tylenol", "analgesic", 400, 50),
            medicine("m5", "Aspirin Out", "analgesic", 100, 1),  // can't cover qty
            medicine("m6", "Amoxicillin", "antibiotic", 50, 50), // wrong category
        ];

        let subs = suggest_substitutes("analgesic", 5, "none", &catalog);
        assert_eq!(subs.len(), MAX_SUBSTITUTES);
        // Lowest price first; price tie broken by name.
        assert_eq!(subs[0].id, "m2");
        assert_eq!(subs[1].id, "m3");
        assert_eq!(subs[2].id, "m1");
    }

    #[test]
    fn test_resolve_line_unmatched() {
        let catalog = vec![medicine("m1", "Paracetamol", "analgesic", 200, 10)];
        let resolved = resolve_line(&line("warfarin", 1), &catalog);

        assert!(!resolved.available);
        assert!(resolved.matched.is_none());
        assert_eq!(resolved.estimated_cost_cents, 0);
        assert!(resolved.substitutes.is_empty());
    }

    #[test]
    fn test_resolve_line_short_stock_offers_substitutes() {
        let catalog = vec![
            medicine("m1", "Paracetamol", "analgesic", 200, 2),
            medicine("m2", "Calpol", "analgesic", 150, 50),
        ];
        let resolved = resolve_line(&line("paracetamol", 5), &catalog);

        assert!(!resolved.available);
        assert_eq!(resolved.estimated_cost_cents, 1000);
        assert_eq!(resolved.substitutes.len(), 1);
        assert_eq!(resolved.substitutes[0].medicine_id, "m2");
    }

    #[test]
    fn test_resolve_lines_aggregate() {
        let catalog = vec![
            medicine("m1", "Paracetamol", "analgesic", 200, 10),
            medicine("m2", "Amoxicillin", "antibiotic", 500, 10),
        ];
        let lines = vec![
            {
                let mut l = line("paracetamol", 2);
                l.position = 0;
                l
            },
            {
                let mut l = line("amoxicillin", 3);
                l.position = 1;
                l
            },
        ];

        let report = resolve_lines("rx1", &lines, &catalog);
        assert_eq!(report.total_lines, 2);
        assert_eq!(report.pending_lines, 2);
        assert_eq!(report.estimated_total_cents, 400 + 1500);
        assert!(report.all_available);
    }

    #[test]
    fn test_resolve_lines_empty_prescription_not_available() {
        let report = resolve_lines("rx1", &[], &[]);
        assert_eq!(report.total_lines, 0);
        assert_eq!(report.estimated_total_cents, 0);
        assert!(!report.all_available);
    }

    #[test]
    fn test_report_serializes_with_camel_case_keys() {
        let catalog = vec![medicine("m1", "Paracetamol", "analgesic", 200, 10)];
        let report = resolve_lines("rx1", &[line("paracetamol", 2)], &catalog);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("allAvailable").is_some());
        assert!(json.get("estimatedTotalCents").is_some());
        assert!(json["lines"][0].get("requestedQuantity").is_some());
    }
}
