// src/models/session.rs

use serde::Serialize;
use sqlx::FromRow;

use crate::models::scope::{self, Scope};

/// Represents the 'user_sessions' table in the database.
/// Scopes are a snapshot taken at login.
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    pub id: i64,
    pub session_token: String,
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub scopes: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// The authenticated caller, injected into request extensions by the
/// auth middleware.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub scopes: Vec<Scope>,
}

impl From<UserSession> for CurrentUser {
    fn from(session: UserSession) -> Self {
        Self {
            user_id: session.user_id,
            scopes: scope::parse_list(&session.scopes),
            username: session.username,
            role: session.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub username: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: LoginUser,
    pub scopes: Vec<Scope>,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_user_uses_session_snapshot() {
        let session = UserSession {
            id: 7,
            session_token: "abc".to_string(),
            user_id: 3,
            username: "user".to_string(),
            role: "user".to_string(),
            scopes: "questions:read".to_string(),
            expires_at: chrono::Utc::now(),
        };

        let user = CurrentUser::from(session);
        assert_eq!(user.user_id, 3);
        assert_eq!(user.scopes, vec![Scope::QuestionsRead]);
    }
}
