// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        role::{CreateRoleRequest, Role, RoleResponse},
        scope::{self, Scope},
        session::CurrentUser,
        user::{CreateUserRequest, User},
    },
    utils::hash::hash_password,
};

/// Lists all users, without password hashes.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, role, created_at
        FROM users
        ORDER BY id
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// Creates a new user with an existing role.
/// Admin only.
pub async fn create_user(
    State(pool): State<PgPool>,
    Extension(admin): Extension<CurrentUser>,
    Json(mut payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.username = payload.username.trim().to_string();
    payload.validate()?;

    let role_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM roles WHERE name = $1")
        .bind(&payload.role)
        .fetch_optional(&pool)
        .await?
        .is_some();

    if !role_exists {
        return Err(AppError::BadRequest(format!(
            "Role '{}' does not exist",
            payload.role
        )));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password_hash, role)
        VALUES ($1, $2, $3)
        RETURNING id, username, password_hash, role, created_at
        "#,
    )
    .bind(&payload.username)
    .bind(hashed_password)
    .bind(&payload.role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    tracing::info!(
        "{} created user '{}' with role '{}'",
        admin.username,
        user.username,
        user.role
    );

    Ok((StatusCode::CREATED, Json(user)))
}

/// Deletes a user by ID, together with their sessions.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == admin.user_id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists all roles with their permissions.
pub async fn list_roles(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let roles = sqlx::query_as::<_, Role>("SELECT id, name, permissions FROM roles ORDER BY id")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list roles: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(
        roles.into_iter().map(RoleResponse::from).collect::<Vec<_>>(),
    ))
}

/// Lists the scopes a role can be granted, with their descriptions.
pub async fn list_scopes() -> impl IntoResponse {
    Json(scope::catalog())
}

/// Creates a role with a set of known scopes.
/// Admin only.
pub async fn create_role(
    State(pool): State<PgPool>,
    Json(mut payload): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.name = payload.name.trim().to_string();
    payload.validate()?;

    let scopes = payload
        .scopes()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let role = sqlx::query_as::<_, Role>(
        r#"
        INSERT INTO roles (name, permissions)
        VALUES ($1, $2)
        RETURNING id, name, permissions
        "#,
    )
    .bind(&payload.name)
    .bind(scope::join(&scopes))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Role '{}' already exists", payload.name))
        } else {
            tracing::error!("Failed to create role: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

async fn change_permission(
    pool: &PgPool,
    id: i64,
    raw_scope: &str,
    grant: bool,
) -> Result<RoleResponse, AppError> {
    let permission: Scope = raw_scope
        .parse()
        .map_err(|e: scope::UnknownScope| AppError::BadRequest(e.to_string()))?;

    let mut tx = pool.begin().await?;

    let mut role = sqlx::query_as::<_, Role>(
        "SELECT id, name, permissions FROM roles WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Role not found".to_string()))?;

    let changed = if grant {
        role.add_permission(permission)
    } else {
        role.remove_permission(permission)
    };

    if changed {
        sqlx::query("UPDATE roles SET permissions = $1 WHERE id = $2")
            .bind(&role.permissions)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tracing::info!(
            "Role '{}' {} '{}'",
            role.name,
            if grant { "granted" } else { "revoked" },
            permission
        );
    }

    tx.commit().await?;
    Ok(RoleResponse::from(role))
}

/// Grants a scope to a role. Existing sessions keep their snapshot.
/// Admin only.
pub async fn add_role_permission(
    State(pool): State<PgPool>,
    Path((id, permission)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(change_permission(&pool, id, &permission, true).await?))
}

/// Revokes a scope from a role.
pub async fn remove_role_permission(
    State(pool): State<PgPool>,
    Path((id, permission)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(change_permission(&pool, id, &permission, false).await?))
}
