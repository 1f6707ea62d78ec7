//! Password hashing for importer-created users.
//!
//! Role definitions live in `foresight-shared`; token validation lives in
//! the API layer. This module only covers credential hashing.

mod password;

pub use password::{PasswordError, hash_password, verify_password};
