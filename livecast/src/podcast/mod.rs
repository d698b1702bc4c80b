use std::fmt;

use auth::claims::{Claims, Role};

pub mod credential;
pub mod manager;


pub use manager::Manager;

/// Who asks for a lifecycle operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Caller {
    Account { id: String, role: Role },
    /// The push-ingest gateway ending a session when its producer goes away
    Implicit,
}

impl Caller {
    pub fn account(id: &str, role: Role) -> Self {
        Caller::Account {
            id: id.to_string(),
            role,
        }
    }

    /// Owner or platform admin
    pub fn may_manage(&self, owner_id: &str) -> bool {
        match self {
            Caller::Account { id, role } => role.is_platform_admin() || id == owner_id,
            Caller::Implicit => true,
        }
    }
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Caller::Account {
            id: claims.id,
            role: claims.role,
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caller::Account { id, role } => write!(f, "{} ({})", id, role),
            Caller::Implicit => write!(f, "ingest"),
        }
    }
}
