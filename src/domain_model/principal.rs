use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct PrincipalId(pub uuid::Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        PrincipalId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(PrincipalId)
    }
}

/// An account as owned by the account subsystem.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: PrincipalId,
    pub handle: String,
    pub name: String,
    pub credential_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    pub fn claims(&self) -> PrincipalClaims {
        PrincipalClaims {
            principal_id: self.id,
            handle: self.handle.clone(),
        }
    }

    pub fn summary(&self) -> PrincipalSummary {
        PrincipalSummary {
            id: self.id,
            handle: self.handle.clone(),
            name: self.name.clone(),
        }
    }
}

/// Identity carried inside every token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalClaims {
    pub principal_id: PrincipalId,
    pub handle: String,
}

/// What callers get to see about the account they authenticated as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrincipalSummary {
    pub id: PrincipalId,
    pub handle: String,
    pub name: String,
}

/// Lowercases and trims an email-like handle.
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().to_lowercase()
}

pub fn is_valid_handle(handle: &str) -> bool {
    match handle.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !handle.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_normalized() {
        assert_eq!(normalize_handle("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn handle_validation() {
        assert!(is_valid_handle("alice@example.com"));
        assert!(!is_valid_handle("alice"));
        assert!(!is_valid_handle("@example.com"));
        assert!(!is_valid_handle("alice@"));
        assert!(!is_valid_handle("a@b@c"));
        assert!(!is_valid_handle("al ice@example.com"));
    }

    #[test]
    fn principal_id_parses_back() {
        let id = PrincipalId::new();
        let parsed: PrincipalId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<PrincipalId>().is_err());
    }
}
