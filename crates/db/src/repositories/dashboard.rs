//! Dashboard orchestration: joins role-scoped projects, fiscal-year
//! forecasts, and the exchange-rate table, then delegates to the pure
//! aggregation engine.

use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use foresight_core::dashboard::{self, DashboardSummary, SummaryParams, TrendAnalysis};
use foresight_core::fiscal::{Quarter, fiscal_year_of};
use foresight_core::scope::{ProjectFilters, ProjectScope};
use foresight_shared::Role;

use crate::entities::users;

use super::exchange_rate::ExchangeRateRepository;
use super::forecast::{ForecastRepository, to_fact};
use super::project::{ProjectRepository, to_facts};

/// Dashboard query after sentinel normalisation at the API edge.
#[derive(Debug, Clone, Default)]
pub struct SummaryRequest {
    /// Exact-match predicates on the project set.
    pub filters: ProjectFilters,
    /// Forecast type restriction, already sentinel-normalised.
    pub forecast_type: Option<String>,
    /// Currency the payload is shaped in.
    pub display_currency: String,
    /// Explicit fiscal start year; defaults to the current one.
    pub year: Option<i32>,
    /// Quarter restriction.
    pub quarter: Option<Quarter>,
}

/// A selectable entity in the filter dropdowns.
#[derive(Debug, Clone, Serialize)]
pub struct NamedOption {
    /// Entity id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
}

/// Distinct filter options for the caller's visible project set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterOptions {
    /// Regions present in the visible projects.
    pub regions: Vec<String>,
    /// Statuses present in the visible projects.
    pub statuses: Vec<String>,
    /// Verticals present in the visible projects.
    pub verticals: Vec<String>,
    /// Currencies carried by the visible projects.
    pub currencies: Vec<String>,
    /// Currencies with stored exchange rates, usable for display.
    pub available_currencies: Vec<String>,
    /// Customer groups present in the visible projects.
    pub customer_groups: Vec<String>,
    /// Customer names present in the visible projects.
    pub customer_names: Vec<String>,
    /// Clusters owning visible projects, labelled by their head.
    pub clusters: Vec<NamedOption>,
    /// Managers selectable for the caller's role.
    pub managers: Vec<NamedOption>,
}

/// Dashboard repository.
#[derive(Debug, Clone)]
pub struct DashboardRepository {
    db: DatabaseConnection,
}

impl DashboardRepository {
    /// Creates a new dashboard repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Computes the dashboard summary for a scope and query.
    pub async fn summary(
        &self,
        scope: ProjectScope,
        request: &SummaryRequest,
    ) -> Result<DashboardSummary, DbErr> {
        let fiscal_year = request
            .year
            .unwrap_or_else(|| fiscal_year_of(Utc::now().date_naive()));

        let projects = ProjectRepository::new(self.db.clone())
            .list_visible(scope)
            .await?;
        let facts: Vec<_> = projects
            .iter()
            .map(to_facts)
            .filter(|p| request.filters.matches(p))
            .collect();
        let project_ids: Vec<Uuid> = facts.iter().map(|p| p.id).collect();

        let forecast_repo = ForecastRepository::new(self.db.clone());
        let forecasts: Vec<_> = forecast_repo
            .for_fiscal_year(
                &project_ids,
                fiscal_year,
                request.quarter,
                request.forecast_type.as_deref(),
            )
            .await?
            .iter()
            .map(to_fact)
            .collect();

        let rates = ExchangeRateRepository::new(self.db.clone())
            .rate_table()
            .await
            .map_err(|e| DbErr::Custom(e.to_string()))?;
        let cluster_names = ProjectRepository::new(self.db.clone())
            .cluster_head_names()
            .await?;
        let fy_seed_years = forecast_repo.distinct_years().await?;

        let params = SummaryParams {
            fiscal_year,
            quarter: request.quarter,
            display_currency: request.display_currency.clone(),
            fy_seed_years,
        };
        Ok(dashboard::summarize(
            &facts,
            &forecasts,
            &rates,
            &cluster_names,
            &params,
        ))
    }

    /// Compares the current fiscal year against the previous one.
    pub async fn trends(
        &self,
        scope: ProjectScope,
        display_currency: &str,
        quarter: Option<Quarter>,
    ) -> Result<TrendAnalysis, DbErr> {
        let current_fy = fiscal_year_of(Utc::now().date_naive());

        let projects = ProjectRepository::new(self.db.clone())
            .list_visible(scope)
            .await?;
        let project_ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();

        let forecast_repo = ForecastRepository::new(self.db.clone());
        let current: Vec<_> = forecast_repo
            .for_fiscal_year(&project_ids, current_fy, quarter, None)
            .await?
            .iter()
            .map(to_fact)
            .collect();
        let previous: Vec<_> = forecast_repo
            .for_fiscal_year(&project_ids, current_fy - 1, quarter, None)
            .await?
            .iter()
            .map(to_fact)
            .collect();

        let rates = ExchangeRateRepository::new(self.db.clone())
            .rate_table()
            .await
            .map_err(|e| DbErr::Custom(e.to_string()))?;

        Ok(dashboard::trends(
            &current,
            &previous,
            &rates,
            current_fy,
            display_currency,
            quarter,
        ))
    }

    /// Gathers distinct filter options for the caller's visible projects.
    pub async fn filter_options(
        &self,
        scope: ProjectScope,
        role: Role,
        user_id: Uuid,
        cluster_id: Option<Uuid>,
    ) -> Result<FilterOptions, DbErr> {
        let project_repo = ProjectRepository::new(self.db.clone());
        let projects = project_repo.list_visible(scope).await?;

        let mut options = FilterOptions::default();
        collect_distinct(&mut options.regions, projects.iter().map(|p| Some(&p.region)));
        collect_distinct(&mut options.statuses, projects.iter().map(|p| p.status.as_ref()));
        collect_distinct(&mut options.verticals, projects.iter().map(|p| p.vertical.as_ref()));
        collect_distinct(&mut options.currencies, projects.iter().map(|p| p.currency.as_ref()));
        collect_distinct(
            &mut options.customer_groups,
            projects.iter().map(|p| p.customer_group.as_ref()),
        );
        collect_distinct(
            &mut options.customer_names,
            projects.iter().map(|p| p.customer_name.as_ref()),
        );

        let head_names = project_repo.cluster_head_names().await?;
        let mut cluster_ids: Vec<Uuid> = projects.iter().filter_map(|p| p.cluster_id).collect();
        cluster_ids.sort_unstable();
        cluster_ids.dedup();
        options.clusters = cluster_ids
            .into_iter()
            .filter_map(|id| {
                head_names
                    .get(&id)
                    .map(|name| NamedOption { id, name: name.clone() })
            })
            .collect();

        options.managers = self.managers_for(role, user_id, cluster_id).await?;

        let rates = ExchangeRateRepository::new(self.db.clone())
            .list()
            .await
            .map_err(|e| DbErr::Custom(e.to_string()))?;
        options.available_currencies = rates.into_iter().map(|r| r.currency_code).collect();

        Ok(options)
    }

    /// Managers selectable in the filter UI, scoped by role: senior heads
    /// see every PM, cluster heads their cluster's PMs, and PMs themselves.
    async fn managers_for(
        &self,
        role: Role,
        user_id: Uuid,
        cluster_id: Option<Uuid>,
    ) -> Result<Vec<NamedOption>, DbErr> {
        let query = users::Entity::find()
            .filter(users::Column::Role.eq(Role::ProjectManager.as_str()))
            .order_by_asc(users::Column::Name);

        let managers = match role {
            Role::SeniorHead => query.all(&self.db).await?,
            Role::ClusterHead => match cluster_id {
                Some(cluster) => {
                    query
                        .filter(users::Column::ClusterId.eq(cluster))
                        .all(&self.db)
                        .await?
                }
                None => vec![],
            },
            Role::ProjectManager => users::Entity::find()
                .filter(users::Column::Id.eq(user_id))
                .all(&self.db)
                .await?,
        };

        Ok(managers
            .into_iter()
            .map(|m| NamedOption {
                id: m.id,
                name: m.name,
            })
            .collect())
    }
}

fn collect_distinct<'a, I>(target: &mut Vec<String>, values: I)
where
    I: Iterator<Item = Option<&'a String>>,
{
    let mut seen: Vec<String> = values.flatten().cloned().collect();
    seen.sort();
    seen.dedup();
    *target = seen;
}
