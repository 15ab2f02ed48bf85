use crate::error::{BookingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Staff,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Staff, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "user" => Ok(Role::User),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            other => Err(BookingError::ValidationFailed(format!(
                "unknown role '{}'",
                other
            ))),
        }
    }
}

/// Role sets accepted by [`Identity::require`].
pub const STAFF_OR_ADMIN: &[Role] = &[Role::Staff, Role::Admin];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// The caller of one core operation, as resolved by the routing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    /// Fails with `Forbidden` unless the caller holds one of `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<()> {
        if self.has_role(roles) {
            Ok(())
        } else {
            Err(BookingError::Forbidden(format!(
                "role '{}' is not one of [{}]",
                self.role,
                roles
                    .iter()
                    .map(Role::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }

    pub fn is_owner_of(&self, owner: UserId) -> bool {
        self.user_id == owner
    }
}
