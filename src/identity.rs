// Identity seam - who is acting, and with what role
// Identity is authoritative: if it cannot be resolved, the whole operation fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// May approve, reject, open reviews and mark requests implemented.
    Administrator,
    /// Any authenticated user; may create and submit their own requests.
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::User => "user",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "administrator" | "admin" => Ok(Role::Administrator),
            "user" => Ok(Role::User),
            other => Err(IdentityError::UnknownRole(other.to_string())),
        }
    }
}

/// The acting user, passed explicitly into every coordinator call so that
/// transitions are a function of (current state, input, actor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub role: Role,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no authenticated user could be resolved: {0}")]
    Unresolved(String),
    #[error("unknown role '{0}'")]
    UnknownRole(String),
}

/// External collaborator that supplies the current user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Result<UserIdentity, IdentityError>;
}

/// Fixed identity resolved once from configuration. Used by the CLI and tests.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    user: UserIdentity,
}

impl StaticIdentity {
    pub fn new(user: UserIdentity) -> Self {
        Self { user }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<UserIdentity, IdentityError> {
        Ok(self.user.clone())
    }
}
