// src/handlers/user.rs

use std::sync::Arc;

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
    models::user::{ChangePasswordRequest, CreateUserRequest, UpdateUserRequest, User},
    services::{account, mailer::Mailer},
    utils::jwt::{AdminUser, CurrentUser},
};

/// Lists all accounts.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password, role, created_at FROM users ORDER BY id",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(users))
}

pub async fn get_user(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = account::find_user(&pool, id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Creates an account with a generated password, which is e-mailed to the user.
/// Admin only.
pub async fn create_user(
    State(pool): State<SqlitePool>,
    State(mailer): State<Arc<dyn Mailer>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = account::create_user(&pool, mailer, &admin, payload).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Updates an account.
///
/// Admins may change anything and the change is audited. Other users may only
/// change their own name and e-mail.
pub async fn update_user(
    State(pool): State<SqlitePool>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = if actor.is_admin() {
        account::admin_update_user(&pool, &actor, id, payload).await?
    } else if actor.id == id {
        account::self_update_user(&pool, &actor, payload).await?
    } else {
        return Err(AppError::Forbidden(
            "You can only edit your own account".to_string(),
        ));
    };

    Ok(Json(user))
}

/// Changes the caller's own password after checking the current one.
pub async fn change_password(
    State(pool): State<SqlitePool>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if actor.id != id {
        return Err(AppError::Forbidden(
            "You can only change your own password".to_string(),
        ));
    }
    payload.validate()?;

    account::change_password(&pool, &actor, payload).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Deletes a user together with their links and questions.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    account::delete_user(&pool, &admin, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
