//! Initial database migration.
//!
//! Creates the clusters, users, projects, forecast_values, and
//! exchange_rates tables plus the indexes the reporting queries rely on.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(CLUSTERS_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(PROJECTS_SQL).await?;
        db.execute_unprepared(FORECAST_VALUES_SQL).await?;
        db.execute_unprepared(EXCHANGE_RATES_SQL).await?;
        db.execute_unprepared(INDEXES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const CLUSTERS_SQL: &str = r"
CREATE TABLE clusters (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    region TEXT NOT NULL CHECK (region IN ('APAC', 'NA', 'EU'))
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('PM', 'CH', 'SH')),
    cluster_id UUID REFERENCES clusters(id),
    created_by UUID REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const PROJECTS_SQL: &str = r"
CREATE TABLE projects (
    id UUID PRIMARY KEY,
    source_country TEXT NOT NULL,
    project_number TEXT,
    op_ids TEXT,
    project_name TEXT NOT NULL,
    region TEXT NOT NULL CHECK (region IN ('APAC', 'NA', 'EU')),
    cluster_id UUID REFERENCES clusters(id) ON DELETE SET NULL,
    manager_id UUID REFERENCES users(id) ON DELETE SET NULL,
    customer_name TEXT,
    customer_group TEXT,
    vertical TEXT,
    project_type TEXT,
    project_group TEXT,
    execution_country TEXT,
    currency TEXT,
    remarks TEXT,
    status TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_by UUID REFERENCES users(id),
    updated_at TIMESTAMPTZ
);
";

const FORECAST_VALUES_SQL: &str = r"
CREATE TABLE forecast_values (
    id UUID PRIMARY KEY,
    project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    forecast_type TEXT NOT NULL,
    source_country TEXT,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    amount NUMERIC(12, 3) NOT NULL,
    forecast_usd NUMERIC(12, 3) NOT NULL,
    actuals NUMERIC(12, 3) NOT NULL DEFAULT 0,
    created_by UUID REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_by UUID REFERENCES users(id),
    updated_at TIMESTAMPTZ
);
";

const EXCHANGE_RATES_SQL: &str = r"
CREATE TABLE exchange_rates (
    currency_code VARCHAR(10) PRIMARY KEY,
    rate_to_usd NUMERIC(18, 9) NOT NULL,
    last_updated TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const INDEXES_SQL: &str = r"
CREATE INDEX idx_projects_project_number ON projects(project_number);
CREATE INDEX idx_projects_cluster_id ON projects(cluster_id);
CREATE INDEX idx_projects_manager_id ON projects(manager_id);
CREATE INDEX idx_forecast_values_project_id ON forecast_values(project_id);
CREATE UNIQUE INDEX idx_forecast_values_identity
    ON forecast_values(project_id, year, month, forecast_type);
CREATE INDEX idx_users_cluster_role ON users(cluster_id, role);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS forecast_values;
DROP TABLE IF EXISTS exchange_rates;
DROP TABLE IF EXISTS projects;
DROP TABLE IF EXISTS users;
DROP TABLE IF EXISTS clusters;
";
