//! User roles for the reporting hierarchy.

use serde::{Deserialize, Serialize};

/// Role of a user in the forecast hierarchy.
///
/// Stored in the database as the short codes `SH`, `CH`, `PM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Senior head: sees every project.
    #[serde(rename = "SH")]
    SeniorHead,
    /// Cluster head: sees projects owned by their cluster.
    #[serde(rename = "CH")]
    ClusterHead,
    /// Project manager: sees their own projects only.
    #[serde(rename = "PM")]
    ProjectManager,
}

impl Role {
    /// Returns the short role code stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SeniorHead => "SH",
            Self::ClusterHead => "CH",
            Self::ProjectManager => "PM",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SH" => Ok(Self::SeniorHead),
            "CH" => Ok(Self::ClusterHead),
            "PM" => Ok(Self::ProjectManager),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Error returned when parsing an unknown role code.
#[derive(Debug, thiserror::Error)]
#[error("unknown role code: {0}")]
pub struct UnknownRole(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("SH", Role::SeniorHead)]
    #[case("CH", Role::ClusterHead)]
    #[case("PM", Role::ProjectManager)]
    fn test_parse_role(#[case] code: &str, #[case] expected: Role) {
        let role: Role = code.parse().unwrap();
        assert_eq!(role, expected);
        assert_eq!(role.as_str(), code);
    }

    #[test]
    fn test_parse_unknown_role() {
        let err = "ADMIN".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unknown role code: ADMIN");
    }
}
