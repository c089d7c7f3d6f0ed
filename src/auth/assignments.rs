use super::principal::Principal;
use crate::tenant::TenantId;

/// Which tenants a SERVICE_ADMIN manages
pub trait TenantAssignments: Send + Sync {
    fn is_assigned(&self, principal: &Principal, tenant: &TenantId) -> bool;
}

/// Trusts the assignment list carried by the principal (token claims).
/// An empty list assigns nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimedAssignments;

impl TenantAssignments for ClaimedAssignments {
    fn is_assigned(&self, principal: &Principal, tenant: &TenantId) -> bool {
        principal.assigned_tenants.iter().any(|assigned| assigned == tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::testing::tenant;

    #[test]
    fn only_listed_tenants_are_assigned() {
        let p = Principal::authenticated("svc", Role::ServiceAdmin)
            .with_assigned_tenants([tenant("douzone")]);
        assert!(ClaimedAssignments.is_assigned(&p, &tenant("douzone")));
        assert!(!ClaimedAssignments.is_assigned(&p, &tenant("arpina")));
        let none = Principal::authenticated("svc", Role::ServiceAdmin);
        assert!(!ClaimedAssignments.is_assigned(&none, &tenant("douzone")));
    }
}
