//! Core business logic for Foresight.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `fiscal` - April-to-March fiscal calendar and quarters
//! - `currency` - Multi-currency conversion through the USD pivot table
//! - `scope` - Role-based project visibility and query filters
//! - `excel` - Spreadsheet column mapping and value cleaning
//! - `reconcile` - Import merge rules and run reports
//! - `dashboard` - The aggregation engine behind the reporting endpoints
//! - `auth` - Password hashing for importer-created users

pub mod auth;
pub mod currency;
pub mod dashboard;
pub mod excel;
pub mod fiscal;
pub mod reconcile;
pub mod scope;
