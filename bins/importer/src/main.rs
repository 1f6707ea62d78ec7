//! Bulk forecast workbook importer.
//!
//! Loads a full forecast workbook (projects + OB forecasts, creating PM/CH
//! users on demand) into the database.
//!
//! Usage: `importer <workbook.xlsx>` with `DATABASE_URL` set. An admin user
//! is created on first run to own the imported records.

use std::fs::File;
use std::io::BufReader;

use anyhow::Context;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use foresight_core::auth::hash_password;
use foresight_db::entities::users;
use foresight_db::repositories::import::{ImportOptions, ImportRepository};
use foresight_shared::Role;

const ADMIN_EMAIL: &str = "importer-admin@foresight.local";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foresight=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: importer <workbook.xlsx>")?;

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;
    let db = foresight_db::connect(&database_url)
        .await
        .context("failed to connect to database")?;

    let admin_id = ensure_admin(&db).await?;
    info!(admin = %admin_id, workbook = %path, "starting workbook import");

    let reader = BufReader::new(File::open(&path).with_context(|| format!("cannot open {path}"))?);
    let repo = ImportRepository::new(db, ImportOptions::default());
    let summary = repo.import_forecast_workbook(reader, admin_id).await?;

    info!(
        rows = summary.rows_processed,
        skipped = summary.rows_skipped,
        failed = summary.rows_failed,
        projects_created = summary.projects_created,
        projects_aggregated = summary.projects_aggregated,
        forecasts_created = summary.forecasts_created,
        forecasts_merged = summary.forecasts_merged,
        users_created = summary.users_created,
        "import finished"
    );

    Ok(())
}

/// Finds or creates the senior-head user that owns imported records.
async fn ensure_admin(db: &DatabaseConnection) -> anyhow::Result<Uuid> {
    if let Some(admin) = users::Entity::find()
        .filter(users::Column::Email.eq(ADMIN_EMAIL))
        .one(db)
        .await?
    {
        return Ok(admin.id);
    }

    let id = Uuid::new_v4();
    let password_hash =
        hash_password("changeme-on-first-login").map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let admin = users::ActiveModel {
        id: Set(id),
        name: Set("Import Admin".to_string()),
        email: Set(ADMIN_EMAIL.to_string()),
        password_hash: Set(password_hash),
        role: Set(Role::SeniorHead.as_str().to_string()),
        cluster_id: Set(None),
        created_by: Set(None),
        created_at: Set(Utc::now().into()),
    };
    admin.insert(db).await?;
    info!("created import admin user");
    Ok(id)
}
