//! Forecast repository: fiscal-year queries and explicit forecast edits.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use foresight_core::currency::{RateTable, USD, round_amount};
use foresight_core::dashboard::ForecastFact;
use foresight_core::fiscal::Quarter;

use crate::entities::forecasts;

/// One forecast line in a create or edit payload.
///
/// Replaces the open-map payloads of earlier iterations: every edit names
/// its (year, month, type, amount) explicitly and is validated before it
/// reaches the database.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ForecastLine {
    /// Forecast type, e.g. `OB`.
    pub forecast_type: String,
    /// Absolute calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
    /// Amount in the project currency.
    pub amount: Decimal,
}

impl ForecastLine {
    /// Validates the line before it reaches the reconciliation layer.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for out-of-range months, years, or
    /// blank types.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=12).contains(&self.month) {
            return Err(format!("month {} is out of range 1-12", self.month));
        }
        if self.year < 1900 || self.year > 2200 {
            return Err(format!("year {} is out of range", self.year));
        }
        if self.forecast_type.trim().is_empty() {
            return Err("forecast_type must not be blank".to_string());
        }
        Ok(())
    }
}

/// Builds the SQL condition selecting one fiscal year of forecast rows:
/// April-December of the start year plus January-March of the next.
#[must_use]
pub fn fiscal_year_condition(fy_start_year: i32) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(forecasts::Column::Year.eq(fy_start_year))
                .add(forecasts::Column::Month.gte(4)),
        )
        .add(
            Condition::all()
                .add(forecasts::Column::Year.eq(fy_start_year + 1))
                .add(forecasts::Column::Month.lte(3)),
        )
}

/// Reduces a stored row to the fact shape the aggregation engine consumes.
#[must_use]
pub fn to_fact(row: &forecasts::Model) -> ForecastFact {
    ForecastFact {
        project_id: row.project_id,
        year: row.year,
        month: u32::try_from(row.month).unwrap_or(0),
        forecast_usd: row.forecast_usd,
        actuals: row.actuals,
    }
}

/// Forecast repository.
#[derive(Debug, Clone)]
pub struct ForecastRepository {
    db: DatabaseConnection,
}

impl ForecastRepository {
    /// Creates a new forecast repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetches forecasts for a project set within one fiscal year,
    /// optionally restricted to a quarter and a forecast type.
    pub async fn for_fiscal_year(
        &self,
        project_ids: &[Uuid],
        fy_start_year: i32,
        quarter: Option<Quarter>,
        forecast_type: Option<&str>,
    ) -> Result<Vec<forecasts::Model>, DbErr> {
        if project_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut query = forecasts::Entity::find()
            .filter(forecasts::Column::ProjectId.is_in(project_ids.to_vec()))
            .filter(fiscal_year_condition(fy_start_year));

        if let Some(quarter) = quarter {
            let months: Vec<i32> = quarter
                .months()
                .iter()
                .map(|m| i32::try_from(*m).unwrap_or(0))
                .collect();
            query = query.filter(forecasts::Column::Month.is_in(months));
        }
        if let Some(forecast_type) = forecast_type {
            query = query.filter(forecasts::Column::ForecastType.eq(forecast_type));
        }

        query.all(&self.db).await
    }

    /// Fetches one project's forecasts for a fiscal year.
    pub async fn for_project(
        &self,
        project_id: Uuid,
        fy_start_year: i32,
    ) -> Result<Vec<forecasts::Model>, DbErr> {
        self.for_fiscal_year(&[project_id], fy_start_year, None, None)
            .await
    }

    /// Distinct calendar years present in the forecast table.
    pub async fn distinct_years(&self) -> Result<Vec<i32>, DbErr> {
        forecasts::Entity::find()
            .select_only()
            .column(forecasts::Column::Year)
            .distinct()
            .into_tuple()
            .all(&self.db)
            .await
    }

    /// Project ids (from the given set) that carry at least one forecast of
    /// the given type.
    pub async fn project_ids_with_type(
        &self,
        project_ids: &[Uuid],
        forecast_type: &str,
    ) -> Result<Vec<Uuid>, DbErr> {
        if project_ids.is_empty() {
            return Ok(vec![]);
        }
        forecasts::Entity::find()
            .select_only()
            .column(forecasts::Column::ProjectId)
            .distinct()
            .filter(forecasts::Column::ProjectId.is_in(project_ids.to_vec()))
            .filter(forecasts::Column::ForecastType.eq(forecast_type))
            .into_tuple()
            .all(&self.db)
            .await
    }

    /// Replaces a project's forecasts for one fiscal year.
    ///
    /// Existing rows in the year window are deleted and non-zero lines are
    /// inserted with a fresh USD snapshot, all in one transaction.
    pub async fn replace_fiscal_year(
        &self,
        project_id: Uuid,
        fy_start_year: i32,
        lines: &[ForecastLine],
        project_currency: Option<&str>,
        rates: &RateTable,
        edited_by: Uuid,
    ) -> Result<usize, DbErr> {
        let txn = self.db.begin().await?;

        forecasts::Entity::delete_many()
            .filter(forecasts::Column::ProjectId.eq(project_id))
            .filter(fiscal_year_condition(fy_start_year))
            .exec(&txn)
            .await?;

        let mut inserted = 0;
        for line in lines {
            if line.amount <= Decimal::ZERO {
                continue;
            }
            insert_line(&txn, project_id, line, project_currency, rates, edited_by).await?;
            inserted += 1;
        }

        txn.commit().await?;
        Ok(inserted)
    }

    /// Upserts individually edited forecast cells.
    ///
    /// An existing row at (project, year, month, type) gets its amount and
    /// USD snapshot overwritten; otherwise a new row is inserted.
    pub async fn upsert_edits(
        &self,
        project_id: Uuid,
        edits: &[ForecastLine],
        project_currency: Option<&str>,
        rates: &RateTable,
        edited_by: Uuid,
    ) -> Result<usize, DbErr> {
        let txn = self.db.begin().await?;
        let mut touched = 0;

        for edit in edits {
            let existing = forecasts::Entity::find()
                .filter(forecasts::Column::ProjectId.eq(project_id))
                .filter(forecasts::Column::Year.eq(edit.year))
                .filter(forecasts::Column::Month.eq(i32::try_from(edit.month).unwrap_or(0)))
                .filter(forecasts::Column::ForecastType.eq(edit.forecast_type.as_str()))
                .one(&txn)
                .await?;

            let forecast_usd = round_amount(
                rates.to_usd(edit.amount, project_currency.unwrap_or(USD)),
            );

            if let Some(row) = existing {
                let mut active: forecasts::ActiveModel = row.into();
                active.amount = Set(edit.amount);
                active.forecast_usd = Set(forecast_usd);
                active.updated_by = Set(Some(edited_by));
                active.updated_at = Set(Some(Utc::now().into()));
                active.update(&txn).await?;
            } else {
                insert_line(&txn, project_id, edit, project_currency, rates, edited_by).await?;
            }
            touched += 1;
        }

        txn.commit().await?;
        Ok(touched)
    }
}

async fn insert_line<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
    line: &ForecastLine,
    project_currency: Option<&str>,
    rates: &RateTable,
    created_by: Uuid,
) -> Result<(), DbErr> {
    let forecast_usd = round_amount(rates.to_usd(line.amount, project_currency.unwrap_or(USD)));

    let row = forecasts::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project_id),
        forecast_type: Set(line.forecast_type.clone()),
        source_country: Set(None),
        year: Set(line.year),
        month: Set(i32::try_from(line.month).unwrap_or(0)),
        amount: Set(line.amount),
        forecast_usd: Set(forecast_usd),
        actuals: Set(Decimal::ZERO),
        created_by: Set(Some(created_by)),
        created_at: Set(Utc::now().into()),
        updated_by: Set(None),
        updated_at: Set(None),
    };
    row.insert(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_forecast_line_validation() {
        let line = ForecastLine {
            forecast_type: "OB".to_string(),
            year: 2025,
            month: 4,
            amount: dec!(100),
        };
        assert!(line.validate().is_ok());

        let bad_month = ForecastLine { month: 13, ..line.clone() };
        assert!(bad_month.validate().unwrap_err().contains("month"));

        let bad_year = ForecastLine { year: 1500, ..line.clone() };
        assert!(bad_year.validate().unwrap_err().contains("year"));

        let blank_type = ForecastLine {
            forecast_type: "  ".to_string(),
            ..line
        };
        assert!(blank_type.validate().is_err());
    }

    #[test]
    fn test_to_fact() {
        let row = forecasts::Model {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            forecast_type: "OB".to_string(),
            source_country: None,
            year: 2025,
            month: 7,
            amount: dec!(10),
            forecast_usd: dec!(11),
            actuals: dec!(0),
            created_by: None,
            created_at: chrono::Utc::now().into(),
            updated_by: None,
            updated_at: None,
        };
        let fact = to_fact(&row);
        assert_eq!(fact.month, 7);
        assert_eq!(fact.forecast_usd, dec!(11));
    }
}
