// src/models/role.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::scope::{self, Scope, UnknownScope};

/// Name of the role allowed into the admin API.
pub const ADMIN_ROLE: &str = "administrator";

/// Represents the 'roles' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    /// Comma-separated scope list.
    pub permissions: String,
}

impl Role {
    pub fn permissions(&self) -> Vec<Scope> {
        scope::parse_list(&self.permissions)
    }

    /// Adds a permission. Returns false if it was already granted.
    pub fn add_permission(&mut self, permission: Scope) -> bool {
        let mut perms = self.permissions();
        if perms.contains(&permission) {
            return false;
        }
        perms.push(permission);
        self.permissions = scope::join(&perms);
        true
    }

    /// Removes a permission. Returns false if it was not granted.
    pub fn remove_permission(&mut self, permission: Scope) -> bool {
        let mut perms = self.permissions();
        let before = perms.len();
        perms.retain(|p| *p != permission);
        if perms.len() == before {
            return false;
        }
        self.permissions = scope::join(&perms);
        true
    }
}

/// DTO for sending a role to the admin client.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: i64,
    pub name: String,
    pub permissions: Vec<Scope>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        let permissions = role.permissions();
        Self {
            id: role.id,
            name: role.name,
            permissions,
        }
    }
}

/// DTO for creating a new role.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 50, message = "Role name must be between 1 and 50 characters."))]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl CreateRoleRequest {
    /// Parses the requested permissions, dropping duplicates.
    pub fn scopes(&self) -> Result<Vec<Scope>, UnknownScope> {
        let mut scopes = Vec::new();
        for raw in &self.permissions {
            let scope = raw.trim().parse::<Scope>()?;
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        Ok(scopes)
    }
}
