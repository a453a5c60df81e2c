// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{
        role::ADMIN_ROLE,
        scope::{self, Scope},
        session::{CurrentUser, UserSession},
    },
    state::AppState,
};

/// Name of the cookie carrying the access token for browser clients.
pub const SESSION_COOKIE: &str = "session_token";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    pub username: String,
    /// User's role (e.g., 'user', 'administrator').
    pub role: String,
    pub scopes: Vec<Scope>,
    /// Session token; the matching `user_sessions` row must exist.
    pub jti: String,
    pub iat: usize,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

fn now_secs() -> Result<usize, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize)
}

/// Signs a new JWT for a session.
pub fn sign_jwt(
    id: i64,
    username: &str,
    role: &str,
    scopes: &[Scope],
    session_token: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let now = now_secs()?;
    let exp = usize::try_from(expiration_seconds)
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
        .ok_or_else(|| {
            AppError::InternalServerError(format!("token lifetime {}s out of range", expiration_seconds))
        })?;

    let claims = Claims {
        sub: id.to_string(),
        username: username.to_owned(),
        role: role.to_owned(),
        scopes: scopes.to_vec(),
        jti: session_token.to_owned(),
        iat: now,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Finds the access token: `Authorization: Bearer` first, then the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value for a fresh session.
pub fn session_cookie(token: &str, max_age: u64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    )
}

/// `Set-Cookie` value that removes the session cookie.
pub fn expired_session_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        SESSION_COOKIE
    )
}

/// Axum Middleware: Authentication.
///
/// Validates the token, then checks that its session is still stored and
/// unexpired. Injects `CurrentUser` into the request extensions; the
/// granted scopes come from the session row.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(req.headers())
        .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))?;

    let claims = verify_jwt(&token, &state.config.jwt_secret)?;

    let session = sqlx::query_as::<_, UserSession>(
        r#"
        SELECT id, session_token, user_id, username, role, scopes, expires_at
        FROM user_sessions
        WHERE session_token = $1 AND expires_at > NOW()
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load session: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or_else(|| AppError::AuthError("Session is invalid".to_string()))?;

    if session.user_id.to_string() != claims.sub {
        tracing::warn!("Token subject {} does not own session {}", claims.sub, session.id);
        return Err(AppError::AuthError("Session is invalid".to_string()));
    }

    req.extensions_mut().insert(CurrentUser::from(session));
    Ok(next.run(req).await)
}

/// Axum Middleware: Scope check.
///
/// Must be used AFTER `auth_middleware`. The state is the list of scopes
/// the route requires; any missing scope yields 403.
pub async fn require_scopes(
    State(required): State<&'static [Scope]>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))?;

    let missing = scope::missing(&user.scopes, required);
    if !missing.is_empty() {
        tracing::debug!("{} lacks scopes {:?}", user.username, missing);
        return Err(AppError::Forbidden {
            required: required.to_vec(),
        });
    }

    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Checks that the caller has the
/// 'administrator' role. If not, returns 403 Forbidden.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))?;

    if user.role != ADMIN_ROLE {
        return Err(AppError::Forbidden { required: Vec::new() });
    }

    Ok(next.run(req).await)
}
