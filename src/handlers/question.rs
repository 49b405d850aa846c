// src/handlers/question.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        question::{OptionInput, Question, QuestionRequest, derive_title},
        user::User,
    },
    services::{
        account,
        question_view::{self, QuestionFilter},
    },
    utils::{html::clean_html, jwt::CurrentUser},
};

pub(crate) async fn fetch_question<'c>(
    executor: impl SqliteExecutor<'c>,
    id: i64,
) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, title, body, difficulty, type, subject_id, creator_id, created_at, updated_at
        FROM questions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))
}

/// Questions (and their options) may be changed by their creator or by an admin.
pub(crate) fn ensure_can_edit(actor: &User, creator_id: i64) -> Result<(), AppError> {
    if actor.is_admin() || actor.id == creator_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the author or an administrator can change this question".to_string(),
        ))
    }
}

/// Resolves who the question is attributed to. Only admins may name someone else.
async fn resolve_creator(
    conn: &mut SqliteConnection,
    actor: &User,
    creator_id: i64,
) -> Result<User, AppError> {
    if creator_id == actor.id {
        return Ok(actor.clone());
    }
    if !actor.is_admin() {
        return Err(AppError::Forbidden(
            "You cannot author questions on behalf of another user".to_string(),
        ));
    }

    account::find_user(&mut *conn, creator_id)
        .await?
        .ok_or(AppError::BadRequest("Creator not found".to_string()))
}

/// A subject, when given, must exist; professors may only use subjects assigned to them.
async fn check_subject(
    conn: &mut SqliteConnection,
    creator: &User,
    subject_id: Option<i64>,
) -> Result<(), AppError> {
    let Some(subject_id) = subject_id else {
        return Ok(());
    };

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM subjects WHERE id = ?")
        .bind(subject_id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Err(AppError::BadRequest("Subject not found".to_string()));
    }

    if creator.is_professor() {
        let linked: Option<i64> = sqlx::query_scalar(
            "SELECT subject_id FROM professor_subjects WHERE professor_id = ? AND subject_id = ?",
        )
        .bind(creator.id)
        .bind(subject_id)
        .fetch_optional(&mut *conn)
        .await?;

        if linked.is_none() {
            return Err(AppError::Forbidden(
                "Professor is not assigned to this subject".to_string(),
            ));
        }
    }

    Ok(())
}

/// Rejects a second question with the same statement, type, subject and creator.
async fn ensure_not_duplicate(
    conn: &mut SqliteConnection,
    body: &str,
    question_type: &str,
    subject_id: Option<i64>,
    creator_id: i64,
    except_id: Option<i64>,
) -> Result<(), AppError> {
    let duplicate: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM questions
        WHERE body = ? AND type = ? AND subject_id IS ? AND creator_id = ? AND id IS NOT ?
        LIMIT 1
        "#,
    )
    .bind(body)
    .bind(question_type)
    .bind(subject_id)
    .bind(creator_id)
    .bind(except_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(existing) = duplicate {
        return Err(AppError::Conflict(format!(
            "An identical question already exists (id {})",
            existing
        )));
    }
    Ok(())
}

async fn insert_options(
    conn: &mut SqliteConnection,
    question_id: i64,
    options: &[OptionInput],
) -> Result<(), AppError> {
    for option in options {
        sqlx::query("INSERT INTO answer_options (question_id, text, is_correct) VALUES (?, ?, ?)")
            .bind(question_id)
            .bind(clean_html(option.text.trim()))
            .bind(option.is_correct)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Sanitizes the statement; it must still carry text afterwards.
fn prepare_body(raw: &str) -> Result<String, AppError> {
    let body = clean_html(raw.trim());
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("Question statement is empty".to_string()));
    }
    Ok(body)
}

/// Lists every question in its flattened form (subject, creator, options, answer).
pub async fn browse_questions(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let questions = question_view::load(&pool, QuestionFilter::All).await?;
    Ok(Json(questions))
}

pub async fn get_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = question_view::load_one(&pool, id).await?;
    Ok(Json(question))
}

pub async fn list_by_creator(
    State(pool): State<SqlitePool>,
    Path(creator_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let questions = question_view::load(&pool, QuestionFilter::Creator(creator_id)).await?;
    Ok(Json(questions))
}

pub async fn list_by_subject(
    State(pool): State<SqlitePool>,
    Path(subject_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let questions = question_view::load(&pool, QuestionFilter::Subject(subject_id)).await?;
    Ok(Json(questions))
}

/// Question counts per type over the whole bank.
pub async fn stats(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(question_view::stats(&pool, None).await?))
}

/// Question counts per type for one author.
pub async fn personal_stats(
    State(pool): State<SqlitePool>,
    Path(creator_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(question_view::stats(&pool, Some(creator_id)).await?))
}

/// Creates a question with its options.
///
/// * Title is derived from the first 50 characters of the statement.
/// * Identical submissions (statement, type, subject, creator) are rejected.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    CurrentUser(actor): CurrentUser,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.check_options()?;

    let body = prepare_body(&payload.body)?;
    let question_type = payload.question_type.as_str();
    let now = Utc::now();

    // Creator and subject checks read inside the transaction that writes.
    let mut tx = pool.begin().await?;

    let creator = resolve_creator(&mut tx, &actor, payload.creator_id.unwrap_or(actor.id)).await?;
    check_subject(&mut tx, &creator, payload.subject_id).await?;

    ensure_not_duplicate(&mut tx, &body, question_type, payload.subject_id, creator.id, None).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions
        (title, body, difficulty, type, subject_id, creator_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(derive_title(&body))
    .bind(&body)
    .bind(payload.difficulty.as_str())
    .bind(question_type)
    .bind(payload.subject_id)
    .bind(creator.id)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    insert_options(&mut tx, id, &payload.options).await?;

    tx.commit().await?;

    tracing::info!(question_id = id, creator_id = creator.id, "Question created");

    let view = question_view::load_one(&pool, id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Replaces a question and its whole option list.
/// Author or admin only.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.check_options()?;

    let body = prepare_body(&payload.body)?;
    let question_type = payload.question_type.as_str();

    let mut tx = pool.begin().await?;

    let existing = fetch_question(&mut *tx, id).await?;
    ensure_can_edit(&actor, existing.creator_id)?;

    let creator_id = payload.creator_id.unwrap_or(existing.creator_id);
    let creator = resolve_creator(&mut tx, &actor, creator_id).await?;
    check_subject(&mut tx, &creator, payload.subject_id).await?;

    ensure_not_duplicate(&mut tx, &body, question_type, payload.subject_id, creator.id, Some(id))
        .await?;

    sqlx::query(
        r#"
        UPDATE questions
        SET title = ?, body = ?, difficulty = ?, type = ?, subject_id = ?, creator_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(derive_title(&body))
    .bind(&body)
    .bind(payload.difficulty.as_str())
    .bind(question_type)
    .bind(payload.subject_id)
    .bind(creator.id)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::from(e)
    })?;

    // Clear-then-insert: the submitted list fully replaces the stored one.
    sqlx::query("DELETE FROM answer_options WHERE question_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    insert_options(&mut tx, id, &payload.options).await?;

    tx.commit().await?;

    let view = question_view::load_one(&pool, id).await?;
    Ok(Json(view))
}

/// Deletes a question and its options.
/// Author or admin only.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let existing = fetch_question(&mut *tx, id).await?;
    ensure_can_edit(&actor, existing.creator_id)?;

    sqlx::query("DELETE FROM answer_options WHERE question_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::from(e)
        })?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
