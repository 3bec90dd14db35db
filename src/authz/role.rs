use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Staff role stored in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Reviewer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::SuperAdmin, Role::Admin, Role::Reviewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super-admin",
            Role::Admin => "admin",
            Role::Reviewer => "reviewer",
        }
    }

    /// Super-admins bypass organization scoping entirely.
    pub fn is_global(&self) -> bool {
        match self {
            Role::SuperAdmin => true,
            Role::Admin | Role::Reviewer => false,
        }
    }

    /// Roles that receive organization-level notifications.
    pub fn is_org_recipient(&self) -> bool {
        match self {
            Role::Admin | Role::Reviewer => true,
            Role::SuperAdmin => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super-admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "reviewer" => Ok(Role::Reviewer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn rejects_unknown_and_miscased_roles() {
        assert!("superadmin".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn serializes_as_kebab_case() {
        assert_eq!(serde_json::to_value(Role::SuperAdmin).unwrap(), "super-admin");
        let role: Role = serde_json::from_value(serde_json::json!("reviewer")).unwrap();
        assert_eq!(role, Role::Reviewer);
    }
}
