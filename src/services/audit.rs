// src/services/audit.rs

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::{audit_log::AuditAction, user::User};

/// Appends an audit entry for an account action performed by `admin`.
///
/// `target_id` is `None` when the entry outlives the target row (deletions).
pub async fn record(
    conn: &mut SqliteConnection,
    admin: &User,
    target_id: Option<i64>,
    target_name: &str,
    action: AuditAction,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (admin_id, admin_name, user_id, user_name, action, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(admin.id)
    .bind(&admin.name)
    .bind(target_id)
    .bind(target_name)
    .bind(action.as_str())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    tracing::info!(
        admin_id = admin.id,
        target_id = ?target_id,
        action = action.as_str(),
        "Audit entry recorded"
    );

    Ok(())
}
