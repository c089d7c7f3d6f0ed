use serde::Serialize;
use uuid::Uuid;

use super::role::Role;
use crate::tenant::TenantId;

/// Caller identity as supplied by the authentication layer.
///
/// `role` is `None` when the supplied role string did not match any known
/// role; such principals are treated as unauthenticated by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub username: String,
    pub user_id: Option<Uuid>,
    pub authenticated: bool,
    pub role: Option<Role>,
    pub raw_role: String,
    /// Tenant a SITE_ADMIN/ADMIN (or lower) belongs to
    pub home_tenant: Option<TenantId>,
    /// Tenants a SERVICE_ADMIN has been assigned to manage
    pub assigned_tenants: Vec<TenantId>,
}

impl Principal {
    pub fn authenticated(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            user_id: None,
            authenticated: true,
            role: Some(role),
            raw_role: role.as_str().to_string(),
            home_tenant: None,
            assigned_tenants: Vec::new(),
        }
    }

    /// Authenticated principal whose role string still needs recognizing
    pub fn with_raw_role(username: impl Into<String>, raw_role: &str) -> Self {
        Self {
            username: username.into(),
            user_id: None,
            authenticated: true,
            role: raw_role.parse().ok(),
            raw_role: raw_role.to_string(),
            home_tenant: None,
            assigned_tenants: Vec::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            username: "anonymous".to_string(),
            user_id: None,
            authenticated: false,
            role: None,
            raw_role: String::new(),
            home_tenant: None,
            assigned_tenants: Vec::new(),
        }
    }

    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_home_tenant(mut self, tenant: TenantId) -> Self {
        self.home_tenant = Some(tenant);
        self
    }

    pub fn with_assigned_tenants(mut self, tenants: impl IntoIterator<Item = TenantId>) -> Self {
        self.assigned_tenants = tenants.into_iter().collect();
        self
    }

    /// Role usable for authorization: authenticated and recognized
    pub fn effective_role(&self) -> Option<Role> {
        if self.authenticated {
            self.role
        } else {
            None
        }
    }
}
