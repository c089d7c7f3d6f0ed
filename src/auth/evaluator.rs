//! Hybrid permission evaluation.
//!
//! A decision composes three gates:
//!
//! - **role gate**: the [`RoleHierarchy`] total order;
//! - **tenant access gate**: which tenants a role may enter;
//! - **content action gate**: which actions a role may take on content.
//!
//! Unauthenticated principals, unrecognized roles, unknown actions and missing
//! inputs all produce a deny decision. Nothing here returns an error: a denial
//! is a [`PermissionDecision`] and the caller decides how to surface it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::assignments::TenantAssignments;
use super::audit::{AuditSink, PermissionAuditEvent};
use super::principal::Principal;
use super::role::{Role, RoleHierarchy};
use crate::tenant::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
        }
    }

    /// Least privileged role allowed to perform the action on content
    pub fn minimum_role(self) -> Role {
        match self {
            Action::Read | Action::Write => Role::Admin,
            // ADMIN may edit but not delete
            Action::Delete => Role::SiteAdmin,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            "delete" => Ok(Action::Delete),
            _ => Err(format!("unknown action '{}'", raw)),
        }
    }
}

/// CRUD verbs used by generic content endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrudOperation {
    List,
    Read,
    Create,
    Update,
    Delete,
}

impl CrudOperation {
    pub fn action(self) -> Action {
        match self {
            CrudOperation::List | CrudOperation::Read => Action::Read,
            CrudOperation::Create | CrudOperation::Update => Action::Write,
            CrudOperation::Delete => Action::Delete,
        }
    }
}

/// Allow/deny plus the ordered reasons that led there
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDecision {
    pub granted: bool,
    pub reasons: Vec<String>,
}

impl PermissionDecision {
    pub fn allow(reasons: Vec<String>) -> Self {
        Self {
            granted: true,
            reasons,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            reasons: vec![reason.into()],
        }
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }
}

/// Single gate result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub passed: bool,
    pub reason: String,
}

impl GateOutcome {
    fn pass(reason: String) -> Self {
        Self {
            passed: true,
            reason,
        }
    }

    fn fail(reason: String) -> Self {
        Self {
            passed: false,
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
}

pub struct PermissionEvaluator {
    default_tenant: TenantId,
    assignments: Arc<dyn TenantAssignments>,
    audit: Arc<dyn AuditSink>,
}

impl PermissionEvaluator {
    pub fn new(
        default_tenant: TenantId,
        assignments: Arc<dyn TenantAssignments>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            default_tenant,
            assignments,
            audit,
        }
    }

    pub fn role_gate(role: Role, minimum: Role) -> bool {
        RoleHierarchy::satisfies(role, minimum)
    }

    pub fn tenant_access_gate(&self, principal: &Principal, role: Role, tenant: &TenantId) -> GateOutcome {
        let is_default = *tenant == self.default_tenant;
        match role {
            Role::SuperAdmin => GateOutcome::pass(format!("{} may access any tenant", role)),
            Role::ServiceAdmin if is_default => {
                GateOutcome::pass(format!("{} may access the integrated tenant", role))
            }
            Role::ServiceAdmin => {
                if self.assignments.is_assigned(principal, tenant) {
                    GateOutcome::pass(format!("{} is assigned to tenant '{}'", role, tenant))
                } else {
                    GateOutcome::fail(format!("{} is not assigned to tenant '{}'", role, tenant))
                }
            }
            _ if is_default => {
                GateOutcome::fail(format!("{} may not access the integrated tenant", role))
            }
            _ => match &principal.home_tenant {
                Some(home) if home == tenant => {
                    GateOutcome::pass(format!("{} belongs to tenant '{}'", role, tenant))
                }
                Some(home) => GateOutcome::fail(format!(
                    "{} belongs to tenant '{}', not '{}'",
                    role, home, tenant
                )),
                None => GateOutcome::fail(format!("{} has no home tenant", role)),
            },
        }
    }

    pub fn content_action_gate(role: Role, content_type: &str, action: Action) -> GateOutcome {
        let minimum = action.minimum_role();
        if Self::role_gate(role, minimum) {
            GateOutcome::pass(format!(
                "{} may {} {} (requires {})",
                role, action, content_type, minimum
            ))
        } else {
            GateOutcome::fail(format!(
                "{} may not {} {} (requires {})",
                role, action, content_type, minimum
            ))
        }
    }

    /// Full check with auditing. `action` is free text from the caller;
    /// unknown actions are denied.
    pub fn evaluate(
        &self,
        principal: Option<&Principal>,
        tenant: &TenantId,
        content_type: &str,
        action: &str,
    ) -> PermissionDecision {
        let decision = match action.parse::<Action>() {
            Ok(action) => self.decide(principal, tenant, content_type, action),
            Err(unknown) => self
                .authenticated_role(principal)
                .err()
                .unwrap_or_else(|| PermissionDecision::deny(unknown)),
        };
        self.audit(principal, tenant, content_type, action, &decision);
        decision
    }

    pub fn evaluate_action(
        &self,
        principal: Option<&Principal>,
        tenant: &TenantId,
        content_type: &str,
        action: Action,
    ) -> PermissionDecision {
        let decision = self.decide(principal, tenant, content_type, action);
        self.audit(principal, tenant, content_type, action.as_str(), &decision);
        decision
    }

    pub fn evaluate_crud(
        &self,
        principal: Option<&Principal>,
        tenant: &TenantId,
        content_type: &str,
        operation: CrudOperation,
    ) -> PermissionDecision {
        self.evaluate_action(principal, tenant, content_type, operation.action())
    }

    /// Authorship-aware check for modifying a specific piece of content.
    ///
    /// SITE_ADMIN and above may modify any content they can reach. Below
    /// that, writes additionally require the principal to be the author; an
    /// unknown author denies.
    pub fn evaluate_owned(
        &self,
        principal: Option<&Principal>,
        tenant: &TenantId,
        content_type: &str,
        action: Action,
        owner: Option<&str>,
    ) -> PermissionDecision {
        let mut decision = self.decide(principal, tenant, content_type, action);
        if decision.granted && action != Action::Read {
            if let (Some(principal), Some(role)) = (principal, principal.and_then(Principal::effective_role)) {
                if Self::role_gate(role, Role::SiteAdmin) {
                    decision
                        .reasons
                        .push(format!("{} may {} content regardless of author", role, action));
                } else if owner == Some(principal.username.as_str()) {
                    decision
                        .reasons
                        .push(format!("'{}' is the author", principal.username));
                } else {
                    decision.granted = false;
                    decision.reasons.push(match owner {
                        Some(owner) => format!(
                            "only the author '{}' may {} this {}",
                            owner, action, content_type
                        ),
                        None => format!("author of this {} is unknown", content_type),
                    });
                }
            }
        }
        self.audit(principal, tenant, content_type, action.as_str(), &decision);
        decision
    }

    /// What the principal may do with a content type, without auditing
    pub fn capabilities(
        &self,
        principal: Option<&Principal>,
        tenant: &TenantId,
        content_type: &str,
    ) -> Capabilities {
        Capabilities {
            can_read: self.decide(principal, tenant, content_type, Action::Read).granted,
            can_write: self.decide(principal, tenant, content_type, Action::Write).granted,
            can_delete: self.decide(principal, tenant, content_type, Action::Delete).granted,
        }
    }

    /// Integrated (cross-tenant) console: SUPER_ADMIN and SERVICE_ADMIN
    pub fn has_integrated_access(principal: Option<&Principal>) -> bool {
        matches!(
            principal.and_then(Principal::effective_role),
            Some(Role::SuperAdmin | Role::ServiceAdmin)
        )
    }

    pub fn is_system_admin(principal: Option<&Principal>) -> bool {
        principal.and_then(Principal::effective_role) == Some(Role::SuperAdmin)
    }

    /// Creating, registering and removing tenant data sources
    pub fn can_manage_services(principal: Option<&Principal>) -> bool {
        Self::is_system_admin(principal)
    }

    fn decide(
        &self,
        principal: Option<&Principal>,
        tenant: &TenantId,
        content_type: &str,
        action: Action,
    ) -> PermissionDecision {
        let (principal, role) = match self.authenticated_role(principal) {
            Ok(found) => found,
            Err(denied) => return denied,
        };

        if role == Role::SuperAdmin {
            return PermissionDecision::allow(vec![format!("{} is granted every permission", role)]);
        }

        let tenant_gate = self.tenant_access_gate(principal, role, tenant);
        let content_gate = Self::content_action_gate(role, content_type, action);
        PermissionDecision {
            granted: tenant_gate.passed && content_gate.passed,
            reasons: vec![tenant_gate.reason, content_gate.reason],
        }
    }

    fn authenticated_role<'p>(
        &self,
        principal: Option<&'p Principal>,
    ) -> Result<(&'p Principal, Role), PermissionDecision> {
        let principal =
            principal.ok_or_else(|| PermissionDecision::deny("unauthenticated: no principal"))?;
        if !principal.authenticated {
            return Err(PermissionDecision::deny("unauthenticated"));
        }
        let role = principal.role.ok_or_else(|| {
            PermissionDecision::deny(format!(
                "unauthenticated: unrecognized role '{}'",
                principal.raw_role
            ))
        })?;
        Ok((principal, role))
    }

    fn audit(
        &self,
        principal: Option<&Principal>,
        tenant: &TenantId,
        content_type: &str,
        action: &str,
        decision: &PermissionDecision,
    ) {
        self.audit.record(&PermissionAuditEvent {
            principal: principal.map_or_else(|| "anonymous".to_string(), |p| p.username.clone()),
            role: principal.and_then(|p| p.role).map(|r| r.as_str().to_string()),
            tenant: tenant.to_string(),
            resource_type: content_type.to_string(),
            action: action.to_string(),
            granted: decision.granted,
            reasons: decision.reasons.clone(),
            checked_at: Utc::now(),
        });
    }
}
