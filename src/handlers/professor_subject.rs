// src/handlers/professor_subject.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::{AppError, is_unique_violation},
    models::professor_subject::{ProfessorSubject, ProfessorSubjectView},
    services::account,
    utils::jwt::AdminUser,
};

pub async fn list_links(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let links = sqlx::query_as::<_, ProfessorSubject>(
        "SELECT professor_id, subject_id FROM professor_subjects ORDER BY professor_id, subject_id",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(links))
}

/// Lists the subjects a professor is linked to.
pub async fn list_by_professor(
    State(pool): State<SqlitePool>,
    Path(professor_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let links = sqlx::query_as::<_, ProfessorSubjectView>(
        r#"
        SELECT ps.professor_id, ps.subject_id, s.name AS subject_name
        FROM professor_subjects ps
        JOIN subjects s ON s.id = ps.subject_id
        WHERE ps.professor_id = ?
        ORDER BY s.name
        "#,
    )
    .bind(professor_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(links))
}

/// Links a professor to a subject.
/// Admin only. The user must hold the PROFESSOR role.
pub async fn create_link(
    State(pool): State<SqlitePool>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<ProfessorSubject>,
) -> Result<impl IntoResponse, AppError> {
    let professor = account::find_user(&pool, payload.professor_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;
    if !professor.is_professor() {
        return Err(AppError::BadRequest(
            "Only professors can be linked to subjects".to_string(),
        ));
    }

    let subject_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM subjects WHERE id = ?")
        .bind(payload.subject_id)
        .fetch_optional(&pool)
        .await?;
    if subject_exists.is_none() {
        return Err(AppError::NotFound("Subject not found".to_string()));
    }

    sqlx::query("INSERT INTO professor_subjects (professor_id, subject_id) VALUES (?, ?)")
        .bind(payload.professor_id)
        .bind(payload.subject_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Professor is already linked to this subject".to_string())
            } else {
                tracing::error!("Failed to create link: {:?}", e);
                AppError::from(e)
            }
        })?;

    tracing::info!(
        professor_id = payload.professor_id,
        subject_id = payload.subject_id,
        admin_id = admin.id,
        "Subject link created"
    );

    Ok((StatusCode::CREATED, Json(payload)))
}

/// Admin only.
pub async fn delete_link(
    State(pool): State<SqlitePool>,
    AdminUser(_admin): AdminUser,
    Path((professor_id, subject_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let result =
        sqlx::query("DELETE FROM professor_subjects WHERE professor_id = ? AND subject_id = ?")
            .bind(professor_id)
            .bind(subject_id)
            .execute(&pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Link not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
