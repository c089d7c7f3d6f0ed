use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized role: {0}")]
pub struct UnknownRole(pub String);

/// Authorization roles, most privileged first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    ServiceAdmin,
    SiteAdmin,
    Admin,
    User,
    Guest,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::SuperAdmin,
        Role::ServiceAdmin,
        Role::SiteAdmin,
        Role::Admin,
        Role::User,
        Role::Guest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::ServiceAdmin => "SERVICE_ADMIN",
            Role::SiteAdmin => "SITE_ADMIN",
            Role::Admin => "ADMIN",
            Role::User => "USER",
            Role::Guest => "GUEST",
        }
    }

    /// Position in the total order; higher is more privileged
    pub fn rank(self) -> u8 {
        match self {
            Role::SuperAdmin => 5,
            Role::ServiceAdmin => 4,
            Role::SiteAdmin => 3,
            Role::Admin => 2,
            Role::User => 1,
            Role::Guest => 0,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `SITE_ADMIN`, `site_admin` and `ROLE_SITE_ADMIN`
impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let name = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("ROLE_"))
            .map_or(trimmed, |_| &trimmed[5..]);

        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownRole(raw.to_string()))
    }
}

/// Total order over [`Role`]: "is this role at least as privileged as that one"
pub struct RoleHierarchy;

impl RoleHierarchy {
    pub fn satisfies(role: Role, required: Role) -> bool {
        role == Role::SuperAdmin || role.rank() >= required.rank()
    }

    /// Every role `role` satisfies, most privileged first
    pub fn implied_roles(role: Role) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|required| Self::satisfies(role, *required))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_satisfies_everything() {
        for required in Role::ALL {
            assert!(RoleHierarchy::satisfies(Role::SuperAdmin, required));
        }
    }

    #[test]
    fn guest_satisfies_only_guest() {
        for required in Role::ALL {
            assert_eq!(
                RoleHierarchy::satisfies(Role::Guest, required),
                required == Role::Guest,
                "GUEST vs {}",
                required
            );
        }
    }

    #[test]
    fn order_is_total_and_strict() {
        for (i, higher) in Role::ALL.iter().enumerate() {
            for lower in &Role::ALL[i + 1..] {
                assert!(RoleHierarchy::satisfies(*higher, *lower));
                assert!(!RoleHierarchy::satisfies(*lower, *higher));
            }
        }
    }

    #[test]
    fn implied_roles_for_site_admin() {
        assert_eq!(
            RoleHierarchy::implied_roles(Role::SiteAdmin),
            vec![Role::SiteAdmin, Role::Admin, Role::User, Role::Guest]
        );
    }

    #[test]
    fn parses_with_and_without_prefix() {
        assert_eq!("SITE_ADMIN".parse::<Role>(), Ok(Role::SiteAdmin));
        assert_eq!("ROLE_service_admin".parse::<Role>(), Ok(Role::ServiceAdmin));
        assert_eq!(" admin ".parse::<Role>(), Ok(Role::Admin));
        assert!("ROOT".parse::<Role>().is_err());
        assert!("ROLE_".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }
}
