// src/handlers/subject.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::subject::{Subject, SubjectRequest},
    utils::jwt::AdminUser,
};

pub async fn list_subjects(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let subjects = sqlx::query_as::<_, Subject>("SELECT id, name FROM subjects ORDER BY name")
        .fetch_all(&pool)
        .await?;

    Ok(Json(subjects))
}

pub async fn get_subject(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let subject = sqlx::query_as::<_, Subject>("SELECT id, name FROM subjects WHERE id = ?")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Subject not found".to_string()))?;

    Ok(Json(subject))
}

/// Admin only.
pub async fn create_subject(
    State(pool): State<SqlitePool>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<SubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let subject = sqlx::query_as::<_, Subject>(
        "INSERT INTO subjects (name) VALUES (?) RETURNING id, name",
    )
    .bind(payload.name.trim())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create subject: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(subject_id = subject.id, admin_id = admin.id, "Subject created");

    Ok((StatusCode::CREATED, Json(subject)))
}

/// Renames a subject.
/// Admin only.
pub async fn update_subject(
    State(pool): State<SqlitePool>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
    Json(payload): Json<SubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let subject = sqlx::query_as::<_, Subject>(
        "UPDATE subjects SET name = ? WHERE id = ? RETURNING id, name",
    )
    .bind(payload.name.trim())
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Subject not found".to_string()))?;

    Ok(Json(subject))
}

/// Deletes a subject. Its professor links go with it; its questions stay,
/// detached from any subject.
/// Admin only.
pub async fn delete_subject(
    State(pool): State<SqlitePool>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete subject: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Subject not found".to_string()));
    }

    tracing::info!(subject_id = id, admin_id = admin.id, "Subject deleted");

    Ok(StatusCode::NO_CONTENT)
}
