// src/handlers/question.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        question::{ChoiceRow, NewQuestion, Question, QuestionRequest, QuestionRow, assemble},
        session::CurrentUser,
    },
};

fn duplicate_question(err: sqlx::Error, text: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(format!("Question '{}' already exists", text))
    } else {
        tracing::error!("Failed to store question: {:?}", err);
        AppError::InternalServerError(err.to_string())
    }
}

async fn insert_choices(
    tx: &mut Transaction<'_, Postgres>,
    question_id: i64,
    question: &NewQuestion,
) -> Result<(), AppError> {
    for (position, (text, is_correct)) in question.choices.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO choices (question_id, choice_text, is_correct, position)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(question_id)
        .bind(text)
        .bind(is_correct)
        .bind(position as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Lists every question with its choices.
pub async fn list_questions(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let questions = sqlx::query_as::<_, QuestionRow>(
        "SELECT id, question_text FROM questions ORDER BY id",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let choices = sqlx::query_as::<_, ChoiceRow>(
        r#"
        SELECT id, question_id, choice_text, is_correct, position
        FROM choices
        ORDER BY question_id, position, id
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list choices: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(assemble(questions, choices)))
}

async fn load_question(pool: &PgPool, id: i64) -> Result<Question, AppError> {
    let question = sqlx::query_as::<_, QuestionRow>(
        "SELECT id, question_text FROM questions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let choices = sqlx::query_as::<_, ChoiceRow>(
        r#"
        SELECT id, question_id, choice_text, is_correct, position
        FROM choices
        WHERE question_id = $1
        ORDER BY position, id
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    assemble(vec![question], choices)
        .pop()
        .ok_or_else(|| AppError::InternalServerError("question vanished while loading".to_string()))
}

/// Fetches one question with its choices.
pub async fn get_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(load_question(&pool, id).await?))
}

/// Creates a question and its choices in one transaction.
pub async fn create_question(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question = payload.normalize()?;

    let mut tx = pool.begin().await?;

    let question_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO questions (question_text) VALUES ($1) RETURNING id",
    )
    .bind(&question.question_text)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| duplicate_question(e, &question.question_text))?;

    insert_choices(&mut tx, question_id, &question).await?;
    tx.commit().await?;

    tracing::info!(
        "{} created question {} with {} choices",
        user.username,
        question_id,
        question.choices.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Question created",
            "question_id": question_id
        })),
    ))
}

/// Replaces a question's text and all of its choices.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question = payload.normalize()?;

    let mut tx = pool.begin().await?;

    let updated = sqlx::query("UPDATE questions SET question_text = $1 WHERE id = $2")
        .bind(&question.question_text)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| duplicate_question(e, &question.question_text))?
        .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    sqlx::query("DELETE FROM choices WHERE question_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    insert_choices(&mut tx, id, &question).await?;
    tx.commit().await?;

    Ok(Json(load_question(&pool, id).await?))
}

/// Deletes a question; its choices go with it.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    tracing::info!("{} deleted question {}", user.username, id);

    Ok(Json(json!({ "message": "Question deleted" })))
}
