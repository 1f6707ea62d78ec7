//! Shared types, errors, and configuration for Foresight.
//!
//! This crate provides common types used across all other crates:
//! - User roles for the reporting hierarchy
//! - JWT claims and token validation
//! - Application-wide error types
//! - Configuration management

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use types::Role;
