//! Authentication claim types.
//!
//! Token issuance lives in the SSO service; this backend only validates
//! bearer tokens and reads the identity carried in the claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Role;
use crate::types::role::UnknownRole;

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// Role code (`SH`, `CH`, `PM`).
    pub role: String,
    /// Cluster the user belongs to, if any.
    pub cluster: Option<Uuid>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        role: Role,
        cluster_id: Option<Uuid>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            role: role.as_str().to_string(),
            cluster: cluster_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the cluster ID from claims, if any.
    #[must_use]
    pub const fn cluster_id(&self) -> Option<Uuid> {
        self.cluster
    }

    /// Parses the role code carried in the claims.
    pub fn role(&self) -> Result<Role, UnknownRole> {
        self.role.parse()
    }
}
