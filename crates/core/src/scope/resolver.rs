//! Role-scoped project visibility.

use uuid::Uuid;

use foresight_shared::Role;

/// The set of projects a user is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectScope {
    /// Senior heads see every project.
    All,
    /// Cluster heads see projects owned by their cluster.
    Cluster(Uuid),
    /// Project managers see projects they manage.
    Manager(Uuid),
    /// A cluster head without an assigned cluster sees nothing.
    Empty,
}

impl ProjectScope {
    /// Resolves the scope for a user.
    #[must_use]
    pub const fn for_user(role: Role, user_id: Uuid, cluster_id: Option<Uuid>) -> Self {
        match role {
            Role::SeniorHead => Self::All,
            Role::ClusterHead => match cluster_id {
                Some(cluster) => Self::Cluster(cluster),
                None => Self::Empty,
            },
            Role::ProjectManager => Self::Manager(user_id),
        }
    }

    /// Membership check against a project's owning manager and cluster.
    #[must_use]
    pub fn permits(&self, manager_id: Option<Uuid>, cluster_id: Option<Uuid>) -> bool {
        match self {
            Self::All => true,
            Self::Cluster(cluster) => cluster_id == Some(*cluster),
            Self::Manager(manager) => manager_id == Some(*manager),
            Self::Empty => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_senior_head_sees_all() {
        let scope = ProjectScope::for_user(Role::SeniorHead, Uuid::new_v4(), None);
        assert_eq!(scope, ProjectScope::All);
        assert!(scope.permits(None, None));
    }

    #[test]
    fn test_cluster_head_scoped_to_cluster() {
        let cluster = Uuid::new_v4();
        let scope = ProjectScope::for_user(Role::ClusterHead, Uuid::new_v4(), Some(cluster));
        assert!(scope.permits(None, Some(cluster)));
        assert!(!scope.permits(None, Some(Uuid::new_v4())));
        assert!(!scope.permits(None, None));
    }

    #[test]
    fn test_cluster_head_without_cluster_sees_nothing() {
        let scope = ProjectScope::for_user(Role::ClusterHead, Uuid::new_v4(), None);
        assert_eq!(scope, ProjectScope::Empty);
        assert!(!scope.permits(Some(Uuid::new_v4()), Some(Uuid::new_v4())));
    }

    #[test]
    fn test_project_manager_scoped_to_self() {
        let user = Uuid::new_v4();
        let scope = ProjectScope::for_user(Role::ProjectManager, user, Some(Uuid::new_v4()));
        assert!(scope.permits(Some(user), None));
        assert!(!scope.permits(Some(Uuid::new_v4()), None));
    }
}
