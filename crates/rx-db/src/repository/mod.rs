//! # Repository Module
//!
//! Database repository implementations for the pharmacy engine.
//!
//! ## Repository Pattern
//! Repositories abstract database access behind a clean API: SQL lives in
//! one place per entity, and the engine composes repository calls inside a
//! single transaction when fulfillment needs atomicity.
//!
//! ## Available Repositories
//!
//! - [`medicine::MedicineRepository`] - catalog CRUD, search, atomic stock ops
//! - [`prescription::PrescriptionRepository`] - prescriptions and line status
//! - [`bill::BillRepository`] - bill creation, payment status, report queries

pub mod bill;
pub mod medicine;
pub mod prescription;
