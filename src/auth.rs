use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::model::UserId;

/// Account capability, decided by the host's identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Student,
    Mentor,
    Admin,
}

/// Authenticated identity handed in by the host on every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Exact role required; admins do not impersonate mentors or students.
    pub fn require_role(&self, role: Role, action: &'static str) -> Result<(), EngineError> {
        if self.role == role {
            Ok(())
        } else {
            Err(EngineError::Authorization(action))
        }
    }

    /// Caller must be this exact user. No admin bypass.
    pub fn require_user(&self, user_id: UserId, action: &'static str) -> Result<(), EngineError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(EngineError::Authorization(action))
        }
    }

    /// Caller must own the resource, or be an admin.
    pub fn require_owner(&self, owner: UserId, action: &'static str) -> Result<(), EngineError> {
        if self.user_id == owner || self.is_admin() {
            Ok(())
        } else {
            Err(EngineError::Authorization(action))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn role_checks_are_exact() {
        let admin = Caller::new(Ulid::new(), Role::Admin);
        assert!(admin.require_role(Role::Mentor, "save availability").is_err());
        let mentor = Caller::new(Ulid::new(), Role::Mentor);
        assert!(mentor.require_role(Role::Mentor, "save availability").is_ok());
    }

    #[test]
    fn owner_check_admits_admin() {
        let owner = Ulid::new();
        let admin = Caller::new(Ulid::new(), Role::Admin);
        let stranger = Caller::new(Ulid::new(), Role::Mentor);
        assert!(admin.require_owner(owner, "delete rule").is_ok());
        assert!(stranger.require_owner(owner, "delete rule").is_err());
        assert!(Caller::new(owner, Role::Mentor).require_owner(owner, "delete rule").is_ok());
    }

    #[test]
    fn user_check_has_no_bypass() {
        let user = Ulid::new();
        let admin = Caller::new(Ulid::new(), Role::Admin);
        assert!(admin.require_user(user, "confirm booking").is_err());
    }
}
