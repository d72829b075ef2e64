use rocket::http::Status;
use serde::Serialize;

use super::{Permission, Role};

/// Authenticated principal supplied by the auth collaborator. This core never
/// stores accounts or sessions; it only consumes the identity handed to it.
#[derive(Debug, Serialize, Clone)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), Status> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                role = %self.role.as_str(),
                permission = ?permission,
                "Permission denied"
            );
            Err(Status::Forbidden)
        }
    }
}
