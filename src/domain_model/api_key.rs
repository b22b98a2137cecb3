use crate::domain_model::TokenDigest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "0000")]
    Basic,
    #[serde(rename = "1111")]
    Partner,
    #[serde(rename = "2222")]
    Admin,
}

impl Permission {
    pub fn code(&self) -> &'static str {
        match self {
            Permission::Basic => "0000",
            Permission::Partner => "1111",
            Permission::Admin => "2222",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0000" => Ok(Permission::Basic),
            "1111" => Ok(Permission::Partner),
            "2222" => Ok(Permission::Admin),
            other => Err(format!("unknown permission code: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiKey {
    pub digest: TokenDigest,
    pub active: bool,
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at > now
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_codes_round_trip() {
        for p in [Permission::Basic, Permission::Partner, Permission::Admin] {
            assert_eq!(p.code().parse::<Permission>().unwrap(), p);
        }
        assert!("9999".parse::<Permission>().is_err());
    }
}
