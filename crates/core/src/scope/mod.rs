//! Role-based project visibility and query filters.
//!
//! This module is the single source of truth for which projects a user may
//! see and which query predicates apply. Every listing and reporting path
//! resolves its project set through it.

pub mod filter;
pub mod resolver;

pub use filter::{IdFilter, ProjectFacts, ProjectFilters, sentinel};
pub use resolver::ProjectScope;
