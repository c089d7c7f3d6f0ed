pub mod assignments;
pub mod audit;
pub mod evaluator;
pub mod principal;
pub mod role;

pub use assignments::{ClaimedAssignments, TenantAssignments};
pub use audit::{AuditSink, PermissionAuditEvent, TracingAuditSink};
pub use evaluator::{
    Action, Capabilities, CrudOperation, GateOutcome, PermissionDecision, PermissionEvaluator,
};
pub use principal::Principal;
pub use role::{Role, RoleHierarchy, UnknownRole};

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::tenant::TenantId;

/// Bearer token payload issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_tenants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, role: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.into(),
            role: role.into(),
            tenant: None,
            assigned_tenants: Vec::new(),
            user_id: None,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_assigned_tenants<I, S>(mut self, tenants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assigned_tenants = tenants.into_iter().map(Into::into).collect();
        self
    }
}

/// Ill-formed tenant ids in claims are dropped rather than failing the token
impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        let mut principal = Principal::with_raw_role(claims.sub, &claims.role);
        if let Some(user_id) = claims.user_id {
            principal = principal.with_user_id(user_id);
        }
        principal.home_tenant = claims.tenant.as_deref().and_then(|t| TenantId::parse(t).ok());
        principal.assigned_tenants = claims
            .assigned_tenants
            .iter()
            .filter_map(|t| TenantId::parse(t).ok())
            .collect();
        principal
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Validate a bearer token and turn its claims into a [`Principal`]
pub fn decode_principal(token: &str, secret: &str) -> Result<Principal, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims.into())
}
