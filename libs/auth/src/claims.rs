use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub id: String,
    pub exp: u64,
    pub role: Role,
}

impl Display for Claims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "id: {}, expire: {}, role: {}", self.id, self.exp, self.role)
    }
}

/// `User` may only listen, `Admin` may create and run its own podcasts,
/// `SuperAdmin` (platform admin) may manage every podcast
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    pub fn is_platform_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Role::User => "user",
                Role::Admin => "admin",
                Role::SuperAdmin => "super_admin",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role() {
        assert!(!Role::User.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Admin.is_platform_admin());
        assert!(Role::SuperAdmin.is_platform_admin());
        assert_eq!(format!("{}", Role::SuperAdmin), "super_admin");
    }
}
