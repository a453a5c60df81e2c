// src/handlers/battery.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::battery::{Battery, CreateBatteryRequest},
};

pub async fn list_batteries(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let batteries = sqlx::query_as::<_, Battery>("SELECT id, name, capacity FROM batteries ORDER BY id")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list batteries: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(batteries))
}

pub async fn create_battery(
    State(pool): State<PgPool>,
    Json(mut payload): Json<CreateBatteryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.name = payload.name.trim().to_string();
    payload.validate()?;

    let battery = sqlx::query_as::<_, Battery>(
        r#"
        INSERT INTO batteries (name, capacity)
        VALUES ($1, $2)
        RETURNING id, name, capacity
        "#,
    )
    .bind(&payload.name)
    .bind(payload.capacity)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Battery '{}' already exists", payload.name))
        } else {
            tracing::error!("Failed to create battery: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(battery)))
}

pub async fn delete_battery(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM batteries WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete battery: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Battery not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
