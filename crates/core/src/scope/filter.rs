//! Query-predicate filtering for project sets.

use uuid::Uuid;

/// The attributes of a project consulted by filters and breakdowns.
#[derive(Debug, Clone)]
pub struct ProjectFacts {
    /// Project id.
    pub id: Uuid,
    /// Business key shared by aggregated OB projects.
    pub project_number: Option<String>,
    /// Region code (`APAC`, `NA`, `EU`).
    pub region: String,
    /// Project status label.
    pub status: Option<String>,
    /// Industry vertical.
    pub vertical: Option<String>,
    /// Customer group.
    pub customer_group: Option<String>,
    /// Customer name.
    pub customer_name: Option<String>,
    /// Project currency code.
    pub currency: Option<String>,
    /// Owning cluster.
    pub cluster_id: Option<Uuid>,
    /// Owning project manager.
    pub manager_id: Option<Uuid>,
}

/// Treats missing values and the literal `"all"` sentinel as "no filter".
#[must_use]
pub fn sentinel(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != "all")
}

/// A filter on a UUID-valued attribute.
///
/// Unparseable values match nothing: an unknown cluster or manager id yields
/// an empty result set rather than an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdFilter {
    /// No filtering.
    #[default]
    Any,
    /// Match this id exactly.
    Id(Uuid),
    /// The supplied value was not a valid UUID; matches nothing.
    Invalid,
}

impl IdFilter {
    /// Parses a query value, honouring the `"all"` sentinel.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match sentinel(value) {
            None => Self::Any,
            Some(raw) => Uuid::parse_str(raw).map_or(Self::Invalid, Self::Id),
        }
    }

    /// Returns true when the candidate id passes this filter.
    #[must_use]
    pub fn matches(self, id: Option<Uuid>) -> bool {
        match self {
            Self::Any => true,
            Self::Id(want) => id == Some(want),
            Self::Invalid => false,
        }
    }
}

/// Exact-match query predicates applied to a role-scoped project set.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilters {
    /// Exact project number.
    pub project_number: Option<String>,
    /// Exact region code.
    pub region: Option<String>,
    /// Exact status label.
    pub status: Option<String>,
    /// Exact vertical.
    pub vertical: Option<String>,
    /// Exact customer group.
    pub customer_group: Option<String>,
    /// Exact customer name.
    pub customer_name: Option<String>,
    /// Exact project currency.
    pub currency: Option<String>,
    /// Owning cluster id.
    pub cluster: IdFilter,
    /// Owning manager id.
    pub manager: IdFilter,
}

fn text_matches(filter: Option<&str>, value: Option<&str>) -> bool {
    filter.is_none_or(|want| value == Some(want))
}

impl ProjectFilters {
    /// Returns true when the project passes every active predicate.
    #[must_use]
    pub fn matches(&self, project: &ProjectFacts) -> bool {
        text_matches(
            self.project_number.as_deref(),
            project.project_number.as_deref(),
        ) && self
            .region
            .as_deref()
            .is_none_or(|want| project.region == want)
            && text_matches(self.status.as_deref(), project.status.as_deref())
            && text_matches(self.vertical.as_deref(), project.vertical.as_deref())
            && text_matches(
                self.customer_group.as_deref(),
                project.customer_group.as_deref(),
            )
            && text_matches(
                self.customer_name.as_deref(),
                project.customer_name.as_deref(),
            )
            && text_matches(self.currency.as_deref(), project.currency.as_deref())
            && self.cluster.matches(project.cluster_id)
            && self.manager.matches(project.manager_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectFacts {
        ProjectFacts {
            id: Uuid::new_v4(),
            project_number: Some("P-100".to_string()),
            region: "EU".to_string(),
            status: Some("active".to_string()),
            vertical: Some("Automotive".to_string()),
            customer_group: None,
            customer_name: None,
            currency: Some("EUR".to_string()),
            cluster_id: Some(Uuid::new_v4()),
            manager_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn test_sentinel() {
        assert_eq!(sentinel(Some("all")), None);
        assert_eq!(sentinel(Some("")), None);
        assert_eq!(sentinel(None), None);
        assert_eq!(sentinel(Some("EU")), Some("EU"));
    }

    #[test]
    fn test_empty_filters_match_everything() {
        assert!(ProjectFilters::default().matches(&project()));
    }

    #[test]
    fn test_text_filter() {
        let filters = ProjectFilters {
            region: Some("EU".to_string()),
            ..Default::default()
        };
        assert!(filters.matches(&project()));

        let filters = ProjectFilters {
            region: Some("NA".to_string()),
            ..Default::default()
        };
        assert!(!filters.matches(&project()));
    }

    #[test]
    fn test_missing_attribute_fails_active_filter() {
        let filters = ProjectFilters {
            customer_group: Some("OEM".to_string()),
            ..Default::default()
        };
        assert!(!filters.matches(&project()));
    }

    #[test]
    fn test_id_filter_parse() {
        assert_eq!(IdFilter::parse(None), IdFilter::Any);
        assert_eq!(IdFilter::parse(Some("all")), IdFilter::Any);
        assert_eq!(IdFilter::parse(Some("not-a-uuid")), IdFilter::Invalid);

        let id = Uuid::new_v4();
        assert_eq!(IdFilter::parse(Some(&id.to_string())), IdFilter::Id(id));
    }

    #[test]
    fn test_invalid_id_filter_matches_nothing() {
        let filters = ProjectFilters {
            cluster: IdFilter::Invalid,
            ..Default::default()
        };
        assert!(!filters.matches(&project()));
    }

    #[test]
    fn test_cluster_filter() {
        let p = project();
        let filters = ProjectFilters {
            cluster: IdFilter::Id(p.cluster_id.unwrap()),
            ..Default::default()
        };
        assert!(filters.matches(&p));
    }
}
