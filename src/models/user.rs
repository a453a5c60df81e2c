// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password_hash: String,

    /// Name of a row in `roles` (e.g. 'administrator', 'user').
    pub role: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for Admin creating a user (can specify role).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Username length must be between 1 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 3,
        max = 128,
        message = "Password length must be between 3 and 128 characters."
    ))]
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "user".to_string()
}

/// OAuth2 password-flow login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Always "password" when sent by an OAuth2 client; not enforced.
    #[serde(default)]
    pub grant_type: Option<String>,
    /// Space-separated scopes the client wants; narrows the grant.
    #[serde(default)]
    pub scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_fail_validation() {
        let req = CreateUserRequest {
            username: "tech".to_string(),
            password: "ab".to_string(),
            role: "user".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn role_defaults_to_user() {
        let req: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "username": "tech",
            "password": "abc"
        }))
        .unwrap();
        assert_eq!(req.role, "user");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: 1,
            username: "admin".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: "administrator".to_string(),
            created_at: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "administrator");
    }
}
