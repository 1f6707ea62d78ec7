//! Excel import reconciliation.
//!
//! Two flows share the column mapper. The actuals reconciliation overwrites
//! `actuals` on existing OB forecast rows and never creates anything. The
//! full workbook import creates projects (and on-demand users and clusters)
//! and aggregates duplicate project numbers by adding OB amounts together.

use std::io::{Read, Seek};

use calamine::Data;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use foresight_core::auth::hash_password;
use foresight_core::currency::{RateTable, USD, round_amount};
use foresight_core::excel::{
    CleanOptions, ColumnMap, ExcelError, IDENTIFIER_ALIASES, cell_text, clean_amount, find_column,
    map_columns, read_first_sheet,
};
use foresight_core::reconcile::{
    ActualsReport, ForecastAction, ImportSummary, OB_FORECAST, UnmatchedActual, merge_op_ids,
    reconcile_amount,
};
use foresight_shared::Role;
use foresight_shared::config::ImportConfig;

use crate::entities::{clusters, forecasts, projects, users};

/// Rows per commit during full imports. A failed batch rolls back alone;
/// earlier batches stay committed.
const BATCH_SIZE: usize = 5;

/// Password for users created on demand by the importer. Accounts are
/// expected to be claimed through SSO before first use.
const DEFAULT_IMPORT_PASSWORD: &str = "changeme-on-first-login";

const EMAIL_DOMAIN: &str = "foresight.local";

/// Import heuristics threaded in from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Two-digit-year expansion pivot.
    pub year_pivot: u8,
    /// Cell cleaning options.
    pub clean: CleanOptions,
    /// Zero-based worksheet row holding the headers.
    pub header_row: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            year_pivot: 50,
            clean: CleanOptions::default(),
            header_row: 0,
        }
    }
}

impl From<&ImportConfig> for ImportOptions {
    fn from(config: &ImportConfig) -> Self {
        Self {
            year_pivot: config.year_pivot,
            clean: CleanOptions {
                parenthesized_negatives: config.parenthesized_negatives,
            },
            header_row: config.header_row,
        }
    }
}

/// Error types for import operations.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The workbook could not be read or mapped.
    #[error(transparent)]
    Excel(#[from] ExcelError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Password hashing failed while creating an import user.
    #[error("failed to hash import user password: {0}")]
    Password(String),
}

/// Non-identifier columns of a full import sheet.
#[derive(Debug, Clone, Default)]
struct FieldColumns {
    project_name: Option<usize>,
    project_manager: Option<usize>,
    cluster_head: Option<usize>,
    source_country: Option<usize>,
    op_ids: Option<usize>,
    customer_name: Option<usize>,
    customer_group: Option<usize>,
    vertical: Option<usize>,
    project_type: Option<usize>,
    project_group: Option<usize>,
    execution_country: Option<usize>,
    currency: Option<usize>,
    remarks: Option<usize>,
    status: Option<usize>,
    forecast_type: Option<usize>,
}

impl FieldColumns {
    fn resolve(headers: &[String]) -> Self {
        Self {
            project_name: find_column(headers, "project name"),
            project_manager: find_column(headers, "project manager"),
            cluster_head: find_column(headers, "cluster head"),
            source_country: find_column(headers, "source country"),
            op_ids: find_column(headers, "op id"),
            customer_name: find_column(headers, "customer name"),
            customer_group: find_column(headers, "customer group"),
            vertical: find_column(headers, "vertical"),
            project_type: find_column(headers, "project type"),
            project_group: find_column(headers, "project group"),
            execution_country: find_column(headers, "execution country"),
            currency: find_column(headers, "currency"),
            remarks: find_column(headers, "remarks"),
            status: find_column(headers, "status"),
            forecast_type: find_column(headers, "forecast type"),
        }
    }
}

fn row_text(row: &[Data], index: Option<usize>) -> Option<String> {
    index.and_then(|i| row.get(i)).and_then(cell_text)
}

/// Generates a deterministic e-mail address for an importer-created user.
#[must_use]
pub fn generate_email(name: &str) -> Option<String> {
    let cleaned = name.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    let parts: Vec<&str> = cleaned.split_whitespace().collect();
    let email = if parts.len() >= 2 {
        format!(
            "{}.{}@{EMAIL_DOMAIN}",
            parts[0].to_lowercase(),
            parts[parts.len() - 1].to_lowercase()
        )
    } else {
        format!("{}@{EMAIL_DOMAIN}", cleaned.to_lowercase().replace(' ', "."))
    };
    Some(email)
}

/// Import repository driving both reconciliation flows.
#[derive(Debug, Clone)]
pub struct ImportRepository {
    db: DatabaseConnection,
    options: ImportOptions,
}

impl ImportRepository {
    /// Creates a new import repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, options: ImportOptions) -> Self {
        Self { db, options }
    }

    // ========================================================================
    // Actuals reconciliation
    // ========================================================================

    /// Reconciles an actuals workbook against existing OB forecast rows.
    ///
    /// Matching rows get `actuals` overwritten (never added). Rows whose
    /// project number is unknown, and values with no forecast to land on,
    /// are accumulated into the report; they never abort the run. The run
    /// commits once at the end.
    pub async fn import_actuals<R: Read + Seek>(
        &self,
        reader: R,
    ) -> Result<ActualsReport, ImportError> {
        let sheet = read_first_sheet(reader, self.options.header_row)?;
        let map = map_columns(&sheet.headers, IDENTIFIER_ALIASES, self.options.year_pivot)?;
        tracing::info!(
            identifier = %sheet.headers[map.identifier],
            month_columns = map.months.len(),
            rows = sheet.rows.len(),
            "starting actuals reconciliation"
        );

        let mut report = ActualsReport::default();
        let txn = self.db.begin().await?;

        for row in &sheet.rows {
            let Some(number) = row_text(row, Some(map.identifier)) else {
                continue;
            };

            let project = projects::Entity::find()
                .filter(projects::Column::ProjectNumber.eq(number.as_str()))
                .one(&txn)
                .await?;
            let Some(project) = project else {
                tracing::warn!(project_number = %number, "project not found, skipping row");
                report.projects_not_found.insert(number);
                continue;
            };
            report.projects_matched.insert(number.clone());

            for column in &map.months {
                let amount = row
                    .get(column.index)
                    .map_or(Decimal::ZERO, |cell| clean_amount(cell, self.options.clean));

                let forecast = forecasts::Entity::find()
                    .filter(forecasts::Column::ProjectId.eq(project.id))
                    .filter(forecasts::Column::Year.eq(column.year))
                    .filter(forecasts::Column::Month.eq(i32::try_from(column.month).unwrap_or(0)))
                    .filter(forecasts::Column::ForecastType.eq(OB_FORECAST))
                    .one(&txn)
                    .await?;

                if let Some(row) = forecast {
                    let mut active: forecasts::ActiveModel = row.into();
                    active.actuals = Set(amount);
                    active.updated_at = Set(Some(Utc::now().into()));
                    active.update(&txn).await?;
                    report.forecasts_updated += 1;
                } else {
                    report.unmatched.push(UnmatchedActual {
                        project_number: number.clone(),
                        year: column.year,
                        month: column.month,
                        amount,
                    });
                }
            }
        }

        txn.commit().await?;
        tracing::info!(
            updated = report.forecasts_updated,
            not_found = report.projects_not_found.len(),
            unmatched = report.unmatched.len(),
            "actuals reconciliation finished"
        );
        Ok(report)
    }

    // ========================================================================
    // Full workbook import
    // ========================================================================

    /// Imports a full forecast workbook: projects, on-demand PM/CH users,
    /// and forecast rows.
    ///
    /// Rows are processed strictly in file order (later rows depend on the
    /// project-creation and merge decisions of earlier ones) and committed
    /// every [`BATCH_SIZE`] rows. A failed batch rolls back alone and its
    /// rows are reported failed; earlier batches stay committed.
    pub async fn import_forecast_workbook<R: Read + Seek>(
        &self,
        reader: R,
        created_by: Uuid,
    ) -> Result<ImportSummary, ImportError> {
        let sheet = read_first_sheet(reader, self.options.header_row)?;
        let map = map_columns(&sheet.headers, IDENTIFIER_ALIASES, self.options.year_pivot)?;
        let fields = FieldColumns::resolve(&sheet.headers);
        let rates = load_rate_table(&self.db).await?;

        tracing::info!(
            rows = sheet.rows.len(),
            month_columns = map.months.len(),
            "starting full workbook import"
        );

        let mut summary = ImportSummary::default();
        for chunk in sheet.rows.chunks(BATCH_SIZE) {
            match self
                .import_batch(chunk, &map, &fields, &rates, created_by)
                .await
            {
                Ok(batch) => summary.absorb(&batch),
                Err(error) => {
                    tracing::error!(error = %error, "batch failed and was rolled back");
                    summary.rows_processed += chunk.len();
                    summary.rows_failed += chunk.len();
                }
            }
        }

        tracing::info!(
            projects_created = summary.projects_created,
            projects_aggregated = summary.projects_aggregated,
            forecasts_created = summary.forecasts_created,
            rows_failed = summary.rows_failed,
            "full workbook import finished"
        );
        Ok(summary)
    }

    async fn import_batch(
        &self,
        rows: &[Vec<Data>],
        map: &ColumnMap,
        fields: &FieldColumns,
        rates: &RateTable,
        created_by: Uuid,
    ) -> Result<ImportSummary, ImportError> {
        let mut batch = ImportSummary::default();
        let txn = self.db.begin().await?;

        for row in rows {
            batch.rows_processed += 1;
            if let Err(error) = self
                .import_row(&txn, row, map, fields, rates, created_by, &mut batch)
                .await
            {
                txn.rollback().await?;
                return Err(error);
            }
        }

        txn.commit().await?;
        Ok(batch)
    }

    #[allow(clippy::too_many_lines)]
    async fn import_row(
        &self,
        txn: &DatabaseTransaction,
        row: &[Data],
        map: &ColumnMap,
        fields: &FieldColumns,
        rates: &RateTable,
        created_by: Uuid,
        batch: &mut ImportSummary,
    ) -> Result<(), ImportError> {
        let number = row_text(row, Some(map.identifier));
        let name = row_text(row, fields.project_name);
        let (Some(number), Some(name)) = (number, name) else {
            batch.rows_skipped += 1;
            return Ok(());
        };

        let currency = row_text(row, fields.currency);
        let currency_code = currency.as_deref().unwrap_or(USD).to_string();
        let forecast_type =
            row_text(row, fields.forecast_type).unwrap_or_else(|| OB_FORECAST.to_string());

        let existing = projects::Entity::find()
            .filter(projects::Column::ProjectNumber.eq(number.as_str()))
            .one(txn)
            .await?;

        if let Some(project) = existing {
            // Aggregation: merge identity, then fold amounts into place.
            let op_ids = merge_op_ids(
                project.op_ids.as_deref(),
                row_text(row, fields.op_ids).as_deref(),
            );
            let project_id = project.id;
            let manager_id = project.manager_id;
            let mut active: projects::ActiveModel = project.into();
            active.op_ids = Set(op_ids);
            active.updated_at = Set(Some(Utc::now().into()));
            active.update(txn).await?;

            for column in &map.months {
                let amount = row
                    .get(column.index)
                    .map_or(Decimal::ZERO, |cell| clean_amount(cell, self.options.clean));
                if amount.is_zero() {
                    continue;
                }
                let usd = round_amount(rates.to_usd(amount, &currency_code));
                self.reconcile_forecast(
                    txn,
                    project_id,
                    &forecast_type,
                    column.year,
                    i32::try_from(column.month).unwrap_or(0),
                    amount,
                    usd,
                    manager_id,
                    batch,
                )
                .await?;
            }
            batch.projects_aggregated += 1;
            return Ok(());
        }

        // New project: resolve its cluster and manager first.
        let cluster_head_name = row_text(row, fields.cluster_head);
        let cluster_id = match cluster_head_name.as_deref() {
            Some(head_name) => Some(
                self.get_or_create_cluster(txn, head_name, row_text(row, fields.source_country))
                    .await?,
            ),
            None => None,
        };
        let manager = match row_text(row, fields.project_manager) {
            Some(pm_name) => {
                self.get_or_create_user(
                    txn,
                    &pm_name,
                    Role::ProjectManager,
                    cluster_id,
                    created_by,
                    batch,
                )
                .await?
            }
            None => None,
        };
        if let Some(head_name) = cluster_head_name.as_deref() {
            self.get_or_create_user(
                txn,
                head_name,
                Role::ClusterHead,
                cluster_id,
                created_by,
                batch,
            )
            .await?;
        }

        let project_id = Uuid::new_v4();
        let project_row = projects::ActiveModel {
            id: Set(project_id),
            source_country: Set(row_text(row, fields.source_country)
                .unwrap_or_else(|| "Unknown".to_string())),
            project_number: Set(Some(number)),
            op_ids: Set(row_text(row, fields.op_ids)),
            project_name: Set(name),
            region: Set("EU".to_string()),
            cluster_id: Set(cluster_id),
            manager_id: Set(manager.as_ref().map(|m| m.id)),
            customer_name: Set(row_text(row, fields.customer_name)),
            customer_group: Set(row_text(row, fields.customer_group)),
            vertical: Set(row_text(row, fields.vertical)),
            project_type: Set(row_text(row, fields.project_type)),
            project_group: Set(row_text(row, fields.project_group)),
            execution_country: Set(row_text(row, fields.execution_country)),
            currency: Set(currency),
            remarks: Set(row_text(row, fields.remarks)),
            status: Set(row_text(row, fields.status)),
            created_at: Set(Utc::now().into()),
            updated_by: Set(None),
            updated_at: Set(None),
        };
        project_row.insert(txn).await?;
        batch.projects_created += 1;

        let forecast_creator = manager.as_ref().map_or(created_by, |m| m.id);
        for column in &map.months {
            let amount = row
                .get(column.index)
                .map_or(Decimal::ZERO, |cell| clean_amount(cell, self.options.clean));
            if amount.is_zero() {
                continue;
            }
            let usd = round_amount(rates.to_usd(amount, &currency_code));
            insert_forecast(
                txn,
                project_id,
                &forecast_type,
                column.year,
                i32::try_from(column.month).unwrap_or(0),
                amount,
                usd,
                Some(forecast_creator),
            )
            .await?;
            batch.forecasts_created += 1;
        }

        Ok(())
    }

    /// Lands one parsed amount on an existing project: OB rows at the same
    /// (year, month) are added to; other types insert-or-overwrite.
    #[allow(clippy::too_many_arguments)]
    async fn reconcile_forecast(
        &self,
        txn: &DatabaseTransaction,
        project_id: Uuid,
        forecast_type: &str,
        year: i32,
        month: i32,
        amount: Decimal,
        usd: Decimal,
        created_by: Option<Uuid>,
        batch: &mut ImportSummary,
    ) -> Result<(), ImportError> {
        let existing = forecasts::Entity::find()
            .filter(forecasts::Column::ProjectId.eq(project_id))
            .filter(forecasts::Column::ForecastType.eq(forecast_type))
            .filter(forecasts::Column::Year.eq(year))
            .filter(forecasts::Column::Month.eq(month))
            .one(txn)
            .await?;

        let action = reconcile_amount(
            forecast_type,
            existing.as_ref().map(|row| (row.amount, row.forecast_usd)),
            amount,
            usd,
        );

        match action {
            ForecastAction::Accumulate {
                amount,
                forecast_usd,
            } => {
                if let Some(row) = existing {
                    update_forecast_row(txn, row, amount, forecast_usd).await?;
                    batch.forecasts_merged += 1;
                }
            }
            ForecastAction::Overwrite {
                amount,
                forecast_usd,
            } => {
                if let Some(row) = existing {
                    update_forecast_row(txn, row, amount, forecast_usd).await?;
                }
            }
            ForecastAction::Insert {
                amount,
                forecast_usd,
            } => {
                insert_forecast(
                    txn,
                    project_id,
                    forecast_type,
                    year,
                    month,
                    amount,
                    forecast_usd,
                    created_by,
                )
                .await?;
                batch.forecasts_created += 1;
            }
        }
        Ok(())
    }

    async fn get_or_create_cluster(
        &self,
        txn: &DatabaseTransaction,
        name: &str,
        region_hint: Option<String>,
    ) -> Result<Uuid, ImportError> {
        if let Some(cluster) = clusters::Entity::find()
            .filter(clusters::Column::Name.eq(name))
            .one(txn)
            .await?
        {
            return Ok(cluster.id);
        }

        let region = match region_hint.as_deref() {
            Some("APAC") => "APAC",
            Some("NA") => "NA",
            _ => "EU",
        };
        let id = Uuid::new_v4();
        let cluster = clusters::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            region: Set(region.to_string()),
        };
        cluster.insert(txn).await?;
        tracing::info!(cluster = name, "created cluster");
        Ok(id)
    }

    async fn get_or_create_user(
        &self,
        txn: &DatabaseTransaction,
        name: &str,
        role: Role,
        cluster_id: Option<Uuid>,
        created_by: Uuid,
        batch: &mut ImportSummary,
    ) -> Result<Option<users::Model>, ImportError> {
        let Some(email) = generate_email(name) else {
            return Ok(None);
        };

        if let Some(user) = users::Entity::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(txn)
            .await?
        {
            return Ok(Some(user));
        }

        let password_hash = hash_password(DEFAULT_IMPORT_PASSWORD)
            .map_err(|e| ImportError::Password(e.to_string()))?;

        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(role.as_str().to_string()),
            cluster_id: Set(cluster_id),
            created_by: Set(Some(created_by)),
            created_at: Set(Utc::now().into()),
        };
        let inserted = user.insert(txn).await?;
        batch.users_created += 1;
        tracing::info!(user = name, role = %role, "created user");
        Ok(Some(inserted))
    }
}

async fn update_forecast_row<C: ConnectionTrait>(
    conn: &C,
    row: forecasts::Model,
    amount: Decimal,
    forecast_usd: Decimal,
) -> Result<(), DbErr> {
    let mut active: forecasts::ActiveModel = row.into();
    active.amount = Set(amount);
    active.forecast_usd = Set(forecast_usd);
    active.updated_at = Set(Some(Utc::now().into()));
    active.update(conn).await?;
    Ok(())
}

async fn load_rate_table<C: ConnectionTrait>(conn: &C) -> Result<RateTable, DbErr> {
    let rows = crate::entities::exchange_rates::Entity::find().all(conn).await?;
    Ok(RateTable::from_rates(
        rows.into_iter().map(|r| (r.currency_code, r.rate_to_usd)),
    ))
}

#[allow(clippy::too_many_arguments)]
async fn insert_forecast<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
    forecast_type: &str,
    year: i32,
    month: i32,
    amount: Decimal,
    forecast_usd: Decimal,
    created_by: Option<Uuid>,
) -> Result<(), DbErr> {
    let row = forecasts::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project_id),
        forecast_type: Set(forecast_type.to_string()),
        source_country: Set(None),
        year: Set(year),
        month: Set(month),
        amount: Set(amount),
        forecast_usd: Set(forecast_usd),
        actuals: Set(Decimal::ZERO),
        created_by: Set(created_by),
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

    #[test]
    fn test_generate_email_two_part_name() {
        assert_eq!(
            generate_email("Jordan Mills").as_deref(),
            Some("jordan.mills@foresight.local")
        );
    }

    #[test]
    fn test_generate_email_strips_commas() {
        // "Last, First" name order from spreadsheets
        assert_eq!(
            generate_email("Mills, Jordan").as_deref(),
            Some("mills.jordan@foresight.local")
        );
    }

    #[test]
    fn test_generate_email_single_name() {
        assert_eq!(
            generate_email("Madrigal").as_deref(),
            Some("madrigal@foresight.local")
        );
    }

    #[test]
    fn test_generate_email_blank() {
        assert_eq!(generate_email("   "), None);
    }

    #[test]
    fn test_import_options_from_config() {
        let config = ImportConfig::default();
        let options = ImportOptions::from(&config);
        assert_eq!(options.year_pivot, 50);
        assert!(options.clean.parenthesized_negatives);
    }
}
