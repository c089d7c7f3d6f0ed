use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced when a raw string is not a usable tenant id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantIdError {
    #[error("Tenant id is empty")]
    Empty,

    #[error("Tenant id too long: {0} characters (max {max})", max = TenantId::MAX_LEN)]
    TooLong(usize),

    #[error("Invalid tenant id: {0}")]
    InvalidCharacters(String),
}

/// Validated tenant (service) identifier.
///
/// Ids are trimmed, case-sensitive and restricted to ASCII letters, digits,
/// `-` and `_`. Anything else is rejected at construction so downstream code
/// (pool names, env lookups, log lines) can use the value as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub const MAX_LEN: usize = 64;

    pub fn parse(raw: &str) -> Result<Self, TenantIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TenantIdError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(TenantIdError::TooLong(trimmed.len()));
        }
        if !Self::is_valid(trimmed) {
            return Err(TenantIdError::InvalidCharacters(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Character-level validity predicate shared by every resolution strategy
    pub fn is_valid(candidate: &str) -> bool {
        !candidate.is_empty()
            && candidate.len() <= Self::MAX_LEN
            && candidate
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix used for namespaced environment variables, e.g. `douzone` -> `DOUZONE`
    pub fn env_prefix(&self) -> String {
        self.0.to_ascii_uppercase().replace('-', "_")
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantId {
    type Error = TenantIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for TenantId {
    type Error = TenantIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl std::str::FromStr for TenantId {
    type Err = TenantIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
