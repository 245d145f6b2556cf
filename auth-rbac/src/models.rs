use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::error::{RbacError, Result};

/// A dotted permission name such as `claims.review`.
///
/// `*` grants everything; `claims.*` grants every permission under `claims.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Permission(String);

impl Permission {
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        let valid = name == "*"
            || (!name.is_empty()
                && name.split('.').all(|part| {
                    part == "*" || (!part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c == '_'))
                })
                && !name.split('.').rev().skip(1).any(|part| part == "*"));
        if !valid {
            return Err(RbacError::InvalidPermission(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether holding `self` grants `required`
    pub fn grants(&self, required: &Permission) -> bool {
        if self.0 == "*" || self.0 == required.0 {
            return true;
        }
        match self.0.strip_suffix('*') {
            Some(prefix) => required.0.starts_with(prefix),
            None => false,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named set of permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub permissions: BTreeSet<Permission>,
}

impl Role {
    pub fn new(name: &str, permissions: &[&str]) -> Result<Self> {
        let permissions = permissions
            .iter()
            .map(|p| Permission::new(p))
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(Self {
            name: name.to_string(),
            permissions,
        })
    }
}

/// The user performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub name: String,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.user_id)
    }
}
