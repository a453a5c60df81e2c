// src/handlers/health.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;

use crate::{db, error::AppError};

/// Service banner.
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Reports whether the database answers.
pub async fn health(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    db::ping(&pool)
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("database ping failed: {}", e)))?;

    Ok(Json(json!({
        "status": "ok",
        "database": "up"
    })))
}
