// src/handlers/auth.rs

use axum::{
    Extension, Form, Json,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        role::Role,
        scope::{self, Scope},
        session::{CurrentUser, LoginResponse, LoginUser},
        user::{LoginForm, User},
    },
    state::AppState,
    utils::{
        hash::verify_password,
        jwt::{expired_session_cookie, extract_token, session_cookie, sign_jwt, verify_jwt},
    },
};

const BAD_CREDENTIALS: &str = "Incorrect username or password";

/// Resolves the scopes granted to a role: its `roles` row when present,
/// otherwise the fixed legacy grants.
async fn role_scopes(state: &AppState, role: &str) -> Result<Vec<Scope>, AppError> {
    let record = sqlx::query_as::<_, Role>("SELECT id, name, permissions FROM roles WHERE name = $1")
        .bind(role)
        .fetch_optional(&state.pool)
        .await?;

    Ok(match record {
        Some(role) => role.permissions(),
        None => {
            tracing::warn!("Role '{}' has no roles row, using legacy grants", role);
            scope::legacy_role_scopes(role)
        }
    })
}

/// Narrows a role's grant to the scopes the client asked for, if any.
fn grant_scopes(role_scopes: Vec<Scope>, requested: Option<&str>) -> Result<Vec<Scope>, AppError> {
    let requested = match requested.map(str::trim) {
        None | Some("") => return Ok(role_scopes),
        Some(raw) => scope::parse_requested(raw).map_err(|e| AppError::BadRequest(e.to_string()))?,
    };

    Ok(role_scopes
        .into_iter()
        .filter(|s| requested.contains(s))
        .collect())
}

/// OAuth2 password flow login.
///
/// Verifies the credentials, stores a session with the granted scopes and
/// returns a signed access token, also set as an HttpOnly cookie.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, role, created_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(form.username.trim())
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let Some(user) = user else {
        tracing::info!("Login attempt for unknown user '{}'", form.username);
        return Err(AppError::BadRequest(BAD_CREDENTIALS.to_string()));
    };

    if !verify_password(&form.password, &user.password_hash)? {
        tracing::info!("Wrong password for '{}'", user.username);
        return Err(AppError::BadRequest(BAD_CREDENTIALS.to_string()));
    }

    let scopes = grant_scopes(role_scopes(&state, &user.role).await?, form.scope.as_deref())?;

    let ttl = state.config.session_ttl;
    let session_token = uuid::Uuid::new_v4().simple().to_string();
    let expires_at = i64::try_from(ttl)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|lifetime| chrono::Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| AppError::InternalServerError(format!("session lifetime {}s out of range", ttl)))?;

    let purged = sqlx::query("DELETE FROM user_sessions WHERE expires_at <= NOW()")
        .execute(&state.pool)
        .await?
        .rows_affected();
    if purged > 0 {
        tracing::debug!("Purged {} expired sessions", purged);
    }

    sqlx::query(
        r#"
        INSERT INTO user_sessions (session_token, user_id, username, role, scopes, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&session_token)
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.role)
    .bind(scope::join(&scopes))
    .bind(expires_at)
    .execute(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to store session: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let token = sign_jwt(
        user.id,
        &user.username,
        &user.role,
        &scopes,
        &session_token,
        &state.config.jwt_secret,
        ttl,
    )?;

    tracing::info!("User '{}' logged in with [{}]", user.username, scope::join(&scopes));

    let body = LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        user: LoginUser {
            username: user.username,
            role: user.role,
        },
        scopes,
        access_token: token.clone(),
        token_type: "bearer".to_string(),
        expires_in: ttl,
    };

    Ok(([(header::SET_COOKIE, session_cookie(&token, ttl))], Json(body)))
}

/// Ends the session named by the presented token, if any, and clears the
/// cookie. Never fails for a missing or stale token.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(claims) = extract_token(&headers)
        .and_then(|token| verify_jwt(&token, &state.config.jwt_secret).ok())
    {
        let removed = sqlx::query("DELETE FROM user_sessions WHERE session_token = $1")
            .bind(&claims.jti)
            .execute(&state.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete session: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?
            .rows_affected();

        if removed > 0 {
            tracing::info!("User '{}' logged out", claims.username);
        }
    }

    Ok((
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(json!({
            "success": true,
            "message": "Logged out"
        })),
    ))
}

/// Returns the caller's session.
pub async fn me(Extension(user): Extension<CurrentUser>) -> impl IntoResponse {
    Json(user)
}
