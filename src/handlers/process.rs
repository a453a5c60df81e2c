// src/handlers/process.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        process_step::{
            ProcessStep, ProcessStepInput, ProcessStepRow, SaveProcessRequest, normalize_steps,
        },
        session::CurrentUser,
    },
};

/// Returns the saved test flow in step order.
pub async fn get_process_steps(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, ProcessStepRow>(
        r#"
        SELECT id, step_index, step_type, current, voltage, end_current,
               step_time, capacity_check, temp_compensation
        FROM process_steps
        ORDER BY step_index
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load process steps: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let steps = rows
        .into_iter()
        .map(ProcessStep::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(steps))
}

/// Template values for a newly added step.
pub async fn default_process_step() -> impl IntoResponse {
    Json(ProcessStepInput::default())
}

/// Replaces the whole test flow. Steps are renumbered in submitted order.
pub async fn save_process_steps(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<SaveProcessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let steps = normalize_steps(payload.steps)?;

    let mut tx = pool.begin().await?;

    // Concurrent saves queue here instead of colliding on step_index
    sqlx::query("LOCK TABLE process_steps IN EXCLUSIVE MODE")
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM process_steps")
        .execute(&mut *tx)
        .await?;

    for step in &steps {
        sqlx::query(
            r#"
            INSERT INTO process_steps
            (step_index, step_type, current, voltage, end_current,
             step_time, capacity_check, temp_compensation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(step.step_index)
        .bind(step.step_type.as_str())
        .bind(step.current)
        .bind(step.voltage)
        .bind(step.end_current)
        .bind(&step.step_time)
        .bind(step.capacity_check)
        .bind(step.temp_compensation)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save process step {}: {:?}", step.step_index, e);
            AppError::InternalServerError(e.to_string())
        })?;
    }

    tx.commit().await?;

    tracing::info!("{} saved a test flow of {} steps", user.username, steps.len());

    Ok(Json(json!({
        "message": format!("Saved {} process steps", steps.len()),
        "saved": steps.len()
    })))
}
