//! Exchange rate repository: rate table loading and atomic bulk upserts.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set,
    TransactionTrait,
};

use foresight_core::currency::RateTable;

use crate::entities::exchange_rates;

/// A single (currency, rate) pair in a bulk update.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RateUpdate {
    /// ISO currency code.
    pub currency_code: String,
    /// Units of USD per unit of this currency.
    pub rate_to_usd: Decimal,
}

/// Error types for exchange rate operations.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeRateError {
    /// Rate must be positive.
    #[error("Exchange rate for '{0}' must be positive")]
    NonPositiveRate(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Exchange rate repository.
#[derive(Debug, Clone)]
pub struct ExchangeRateRepository {
    db: DatabaseConnection,
}

impl ExchangeRateRepository {
    /// Creates a new exchange rate repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists all rates ordered by currency code.
    pub async fn list(&self) -> Result<Vec<exchange_rates::Model>, ExchangeRateError> {
        let rates = exchange_rates::Entity::find()
            .order_by_asc(exchange_rates::Column::CurrencyCode)
            .all(&self.db)
            .await?;
        Ok(rates)
    }

    /// Loads the whole table as an in-memory [`RateTable`].
    ///
    /// Reads are not snapshot-isolated from concurrent rate updates; a
    /// request loads the table once and keeps that view for its whole
    /// computation (reporting-grade consistency).
    pub async fn rate_table(&self) -> Result<RateTable, ExchangeRateError> {
        let rows = exchange_rates::Entity::find().all(&self.db).await?;
        Ok(RateTable::from_rates(
            rows.into_iter().map(|r| (r.currency_code, r.rate_to_usd)),
        ))
    }

    /// Applies a bulk rate update atomically.
    ///
    /// Each pair updates the existing row or inserts a new one, stamping
    /// `last_updated`; last write wins. The whole batch runs in a single
    /// transaction, so a failure part-way leaves no partial application.
    pub async fn set_rates(&self, updates: &[RateUpdate]) -> Result<usize, ExchangeRateError> {
        for update in updates {
            if update.rate_to_usd <= Decimal::ZERO {
                return Err(ExchangeRateError::NonPositiveRate(
                    update.currency_code.clone(),
                ));
            }
        }

        let txn = self.db.begin().await?;
        for update in updates {
            upsert_rate(&txn, update).await?;
        }
        txn.commit().await?;

        Ok(updates.len())
    }
}

async fn upsert_rate<C: ConnectionTrait>(conn: &C, update: &RateUpdate) -> Result<(), DbErr> {
    let now = chrono::Utc::now().into();
    let existing = exchange_rates::Entity::find_by_id(&update.currency_code)
        .one(conn)
        .await?;

    if let Some(row) = existing {
        let mut active: exchange_rates::ActiveModel = row.into();
        active.rate_to_usd = Set(update.rate_to_usd);
        active.last_updated = Set(now);
        active.update(conn).await?;
    } else {
        let row = exchange_rates::ActiveModel {
            currency_code: Set(update.currency_code.clone()),
            rate_to_usd: Set(update.rate_to_usd),
            last_updated: Set(now),
        };
        row.insert(conn).await?;
    }

    Ok(())
}

// ============================================================================
// Pure planning functions for property testing
// ============================================================================

/// Applies updates to a stored map the way `set_rates` does: update if the
/// code exists, insert otherwise, last write wins.
pub fn apply_rate_updates(stored: &mut HashMap<String, Decimal>, updates: &[RateUpdate]) {
    for update in updates {
        stored.insert(update.currency_code.clone(), update.rate_to_usd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn update(code: &str, rate: Decimal) -> RateUpdate {
        RateUpdate {
            currency_code: code.to_string(),
            rate_to_usd: rate,
        }
    }

    /// Applying the same payload twice yields identical stored rates: the
    /// upsert is idempotent and never duplicates a currency.
    #[test]
    fn test_rate_update_idempotent() {
        let payload = vec![update("INR", dec!(0.012)), update("EUR", dec!(1.1))];

        let mut once = HashMap::new();
        apply_rate_updates(&mut once, &payload);

        let mut twice = once.clone();
        apply_rate_updates(&mut twice, &payload);

        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_last_write_wins() {
        let mut stored = HashMap::new();
        apply_rate_updates(
            &mut stored,
            &[update("INR", dec!(0.012)), update("INR", dec!(0.013))],
        );
        assert_eq!(stored["INR"], dec!(0.013));
    }

    #[test]
    fn test_update_preserves_other_codes() {
        let mut stored = HashMap::from([("EUR".to_string(), dec!(1.1))]);
        apply_rate_updates(&mut stored, &[update("INR", dec!(0.012))]);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored["EUR"], dec!(1.1));
    }
}
