//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Spreadsheet import configuration.
    #[serde(default)]
    pub import: ImportConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for validating tokens.
    pub secret: String,
    /// Access token expiration in minutes.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expires_minutes: i64,
}

fn default_access_token_expiry() -> i64 {
    60
}

/// Spreadsheet import configuration.
///
/// The source system disagreed with itself on two parsing heuristics (the
/// two-digit-year pivot and parenthesised negatives); both are pinned here
/// with a single documented default instead of varying per import path.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Two-digit years at or below this value expand to 20xx, above to 19xx.
    #[serde(default = "default_year_pivot")]
    pub year_pivot: u8,
    /// Whether `(123)` in a cell is read as a negative amount.
    #[serde(default = "default_paren_negatives")]
    pub parenthesized_negatives: bool,
    /// Zero-based worksheet row holding the column headers.
    #[serde(default)]
    pub header_row: usize,
}

fn default_year_pivot() -> u8 {
    50
}

fn default_paren_negatives() -> bool {
    true
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            year_pivot: default_year_pivot(),
            parenthesized_negatives: default_paren_negatives(),
            header_row: 0,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("FORESIGHT").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_defaults() {
        let import = ImportConfig::default();
        assert_eq!(import.year_pivot, 50);
        assert!(import.parenthesized_negatives);
        assert_eq!(import.header_row, 0);
    }
}
