// src/handlers/answer_option.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::question::{ensure_can_edit, fetch_question},
    models::{
        answer_option::{AnswerOption, CreateOptionRequest, UpdateOptionRequest},
        question::{Question, QuestionType, check_option_rules},
    },
    utils::{html::clean_html, jwt::CurrentUser},
};

async fn fetch_option<'c>(
    executor: impl SqliteExecutor<'c>,
    id: i64,
) -> Result<AnswerOption, AppError> {
    sqlx::query_as::<_, AnswerOption>(
        "SELECT id, question_id, text, is_correct FROM answer_options WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound("Answer option not found".to_string()))
}

/// Re-checks the question's stored option list against its type.
/// Runs after the change, inside the same transaction, so a failure rolls it back.
async fn ensure_option_rules(conn: &mut SqliteConnection, question: &Question) -> Result<(), AppError> {
    let question_type = QuestionType::parse(&question.question_type).ok_or_else(|| {
        AppError::InternalServerError(format!("Unknown type stored for question {}", question.id))
    })?;

    let correct: Vec<bool> =
        sqlx::query_scalar("SELECT is_correct FROM answer_options WHERE question_id = ? ORDER BY id")
            .bind(question.id)
            .fetch_all(&mut *conn)
            .await?;

    check_option_rules(question_type, &correct)
}

pub async fn list_options(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let options = sqlx::query_as::<_, AnswerOption>(
        "SELECT id, question_id, text, is_correct FROM answer_options ORDER BY question_id, id",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(options))
}

pub async fn get_option(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_option(&pool, id).await?))
}

pub async fn list_by_question(
    State(pool): State<SqlitePool>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let options = sqlx::query_as::<_, AnswerOption>(
        "SELECT id, question_id, text, is_correct FROM answer_options WHERE question_id = ? ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(options))
}

/// Adds a single option to an existing question.
/// Author or admin only. The resulting list must still fit the question type.
pub async fn create_option(
    State(pool): State<SqlitePool>,
    CurrentUser(actor): CurrentUser,
    Json(payload): Json<CreateOptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let question = fetch_question(&mut *tx, payload.question_id).await?;
    ensure_can_edit(&actor, question.creator_id)?;

    let option = sqlx::query_as::<_, AnswerOption>(
        r#"
        INSERT INTO answer_options (question_id, text, is_correct)
        VALUES (?, ?, ?)
        RETURNING id, question_id, text, is_correct
        "#,
    )
    .bind(question.id)
    .bind(clean_html(payload.text.trim()))
    .bind(payload.is_correct)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create answer option: {:?}", e);
        AppError::from(e)
    })?;

    ensure_option_rules(&mut tx, &question).await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(option)))
}

/// Author or admin only. The resulting list must still fit the question type,
/// so the correct answer is moved by replacing the question's options.
pub async fn update_option(
    State(pool): State<SqlitePool>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let existing = fetch_option(&mut *tx, id).await?;
    let question = fetch_question(&mut *tx, existing.question_id).await?;
    ensure_can_edit(&actor, question.creator_id)?;

    let option = sqlx::query_as::<_, AnswerOption>(
        r#"
        UPDATE answer_options SET text = ?, is_correct = ?
        WHERE id = ?
        RETURNING id, question_id, text, is_correct
        "#,
    )
    .bind(clean_html(payload.text.trim()))
    .bind(payload.is_correct)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    ensure_option_rules(&mut tx, &question).await?;

    tx.commit().await?;

    Ok(Json(option))
}

/// Author or admin only. Refused when the question would be left with too few options.
pub async fn delete_option(
    State(pool): State<SqlitePool>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let existing = fetch_option(&mut *tx, id).await?;
    let question = fetch_question(&mut *tx, existing.question_id).await?;
    ensure_can_edit(&actor, question.creator_id)?;

    sqlx::query("DELETE FROM answer_options WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    ensure_option_rules(&mut tx, &question).await?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
