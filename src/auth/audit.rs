use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one permission check, as handed to the audit sink
#[derive(Debug, Clone, Serialize)]
pub struct PermissionAuditEvent {
    pub principal: String,
    pub role: Option<String>,
    pub tenant: String,
    pub resource_type: String,
    pub action: String,
    pub granted: bool,
    pub reasons: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: &PermissionAuditEvent);
}

/// Emits audit events as structured `tracing` records under the `audit` target
#[derive(Debug, Clone, Copy)]
pub struct TracingAuditSink {
    enabled: bool,
}

impl TracingAuditSink {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &PermissionAuditEvent) {
        if !self.enabled {
            return;
        }
        tracing::info!(
            target: "audit",
            principal = %event.principal,
            role = event.role.as_deref().unwrap_or("UNKNOWN"),
            tenant = %event.tenant,
            resource = %event.resource_type,
            action = %event.action,
            granted = event.granted,
            reasons = %event.reasons.join("; "),
            "PERMISSION_CHECK"
        );
    }
}
