// src/handlers/audit_log.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{error::AppError, models::audit_log::AuditLog, utils::jwt::AdminUser};

const AUDIT_COLUMNS: &str = "id, admin_id, admin_name, user_id, user_name, action, created_at";

/// Lists audit entries, newest first.
/// Admin only.
pub async fn list_logs(
    State(pool): State<SqlitePool>,
    AdminUser(_admin): AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let logs = sqlx::query_as::<_, AuditLog>(&format!(
        "SELECT {AUDIT_COLUMNS} FROM audit_logs ORDER BY id DESC"
    ))
    .fetch_all(&pool)
    .await?;

    Ok(Json(logs))
}

/// Admin only.
pub async fn get_log(
    State(pool): State<SqlitePool>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let log = sqlx::query_as::<_, AuditLog>(&format!(
        "SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Log entry not found".to_string()))?;

    Ok(Json(log))
}

/// Admin only.
pub async fn delete_log(
    State(pool): State<SqlitePool>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM audit_logs WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Log entry not found".to_string()));
    }

    tracing::info!(log_id = id, admin_id = admin.id, "Audit entry deleted");

    Ok(StatusCode::NO_CONTENT)
}
