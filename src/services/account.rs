// src/services/account.rs

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::{
        audit_log::AuditAction,
        user::{ChangePasswordRequest, CreateUserRequest, Role, UpdateUserRequest, User},
    },
    services::{
        audit,
        mailer::{self, Mailer, OutgoingMail},
    },
    utils::{
        hash::{hash_password, verify_password},
        password::generate_password,
    },
};

const USER_COLUMNS: &str = "id, name, email, password, role, created_at";

/// E-mails are matched case-insensitively, so they are stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Works on the pool or inside a caller's transaction.
pub async fn find_user<'c>(
    executor: impl SqliteExecutor<'c>,
    id: i64,
) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    let user =
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await?;
    Ok(user)
}

/// Resolves the acting user and checks that it currently holds the ADMIN role.
pub async fn require_admin(pool: &SqlitePool, actor_id: i64) -> Result<User, AppError> {
    match find_user(pool, actor_id).await? {
        Some(user) if user.is_admin() => Ok(user),
        _ => Err(AppError::Forbidden(
            "Only administrators can perform this action".to_string(),
        )),
    }
}

async fn fetch_user_in(conn: &mut SqliteConnection, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

async fn ensure_email_free(
    conn: &mut SqliteConnection,
    email: &str,
    except_id: Option<i64>,
) -> Result<(), AppError> {
    let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = ? AND id IS NOT ?")
        .bind(email)
        .bind(except_id)
        .fetch_optional(&mut *conn)
        .await?;

    if taken.is_some() {
        return Err(AppError::Conflict(format!("E-mail '{}' is already registered", email)));
    }
    Ok(())
}

fn map_email_conflict(err: sqlx::Error, email: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(format!("E-mail '{}' is already registered", email))
    } else {
        tracing::error!("Failed to write user: {:?}", err);
        AppError::from(err)
    }
}

/// Links `professor_id` to each listed subject. Unknown subjects and
/// already existing links are skipped.
async fn link_subjects(
    conn: &mut SqliteConnection,
    professor_id: i64,
    subject_ids: &[i64],
) -> Result<(), AppError> {
    let unique: HashSet<i64> = subject_ids.iter().copied().collect();

    for subject_id in unique {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO professor_subjects (professor_id, subject_id)
            SELECT ?, id FROM subjects WHERE id = ?
            "#,
        )
        .bind(professor_id)
        .bind(subject_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(professor_id, subject_id, "Subject link skipped");
        }
    }

    Ok(())
}

/// Makes the professor's links match `subject_ids` exactly.
async fn sync_subject_links(
    conn: &mut SqliteConnection,
    professor_id: i64,
    subject_ids: &[i64],
) -> Result<(), AppError> {
    let current: Vec<i64> =
        sqlx::query_scalar("SELECT subject_id FROM professor_subjects WHERE professor_id = ?")
            .bind(professor_id)
            .fetch_all(&mut *conn)
            .await?;

    let wanted: HashSet<i64> = subject_ids.iter().copied().collect();

    for subject_id in current.iter().filter(|id| !wanted.contains(id)) {
        sqlx::query("DELETE FROM professor_subjects WHERE professor_id = ? AND subject_id = ?")
            .bind(professor_id)
            .bind(subject_id)
            .execute(&mut *conn)
            .await?;
    }

    let added: Vec<i64> = wanted
        .into_iter()
        .filter(|id| !current.contains(id))
        .collect();
    link_subjects(conn, professor_id, &added).await
}

async fn clear_subject_links(conn: &mut SqliteConnection, professor_id: i64) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM professor_subjects WHERE professor_id = ?")
        .bind(professor_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

fn welcome_mail(user: &User, password: &str) -> OutgoingMail {
    OutgoingMail {
        to: user.email.clone(),
        subject: "Welcome to EasyQuiz".to_string(),
        body: format!(
            "Hello {},\n\nYour EasyQuiz account has been created.\n\nLogin: {}\nPassword: {}\n\nPlease change your password after the first login.",
            user.name, user.email, password
        ),
    }
}

/// Creates an account on behalf of `admin`.
///
/// The user row, subject links and CREATE audit entry are committed together.
/// The generated credential is then mailed in the background; a failed send
/// never undoes the account.
pub async fn create_user(
    pool: &SqlitePool,
    mailer: Arc<dyn Mailer>,
    admin: &User,
    req: CreateUserRequest,
) -> Result<User, AppError> {
    let email = normalize_email(&req.email);
    let password = generate_password();
    let hashed_password = hash_password(&password)?;

    let mut tx = pool.begin().await?;

    ensure_email_free(&mut tx, &email, None).await?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (name, email, password, role, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(req.name.trim())
    .bind(&email)
    .bind(&hashed_password)
    .bind(req.role.as_str())
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_email_conflict(e, &email))?;

    if req.role == Role::Professor {
        link_subjects(&mut tx, user.id, &req.subject_ids).await?;
    }

    audit::record(&mut tx, admin, Some(user.id), &user.name, AuditAction::Create).await?;

    tx.commit().await?;

    tracing::info!(user_id = user.id, admin_id = admin.id, role = %user.role, "User created");

    mailer::send_in_background(mailer, welcome_mail(&user, &password));

    Ok(user)
}

/// Admin-driven update: name, e-mail, role and subject links, plus an UPDATE audit entry.
///
/// Links are reconciled against `subject_ids` when given; an account that is
/// not a professor keeps no links.
pub async fn admin_update_user(
    pool: &SqlitePool,
    admin: &User,
    target_id: i64,
    req: UpdateUserRequest,
) -> Result<User, AppError> {
    let email = normalize_email(&req.email);

    let mut tx = pool.begin().await?;

    let target = fetch_user_in(&mut tx, target_id).await?;
    ensure_email_free(&mut tx, &email, Some(target.id)).await?;

    let role = match req.role {
        Some(role) => role,
        None => Role::parse(&target.role).ok_or_else(|| {
            AppError::InternalServerError(format!("Unknown role stored for user {}", target.id))
        })?,
    };

    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET name = ?, email = ?, role = ? WHERE id = ? RETURNING {USER_COLUMNS}"
    ))
    .bind(req.name.trim())
    .bind(&email)
    .bind(role.as_str())
    .bind(target.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_email_conflict(e, &email))?;

    match (role, req.subject_ids) {
        (Role::Professor, Some(subject_ids)) => {
            sync_subject_links(&mut tx, user.id, &subject_ids).await?
        }
        (Role::Professor, None) => {}
        (Role::Admin, _) => {
            clear_subject_links(&mut tx, user.id).await?;
        }
    }

    audit::record(&mut tx, admin, Some(user.id), &user.name, AuditAction::Update).await?;

    tx.commit().await?;

    tracing::info!(user_id = user.id, admin_id = admin.id, "User updated by admin");

    Ok(user)
}

/// Self-service update: a user may change only their own name and e-mail.
pub async fn self_update_user(
    pool: &SqlitePool,
    user: &User,
    req: UpdateUserRequest,
) -> Result<User, AppError> {
    let email = normalize_email(&req.email);

    let mut conn = pool.acquire().await?;
    ensure_email_free(&mut conn, &email, Some(user.id)).await?;

    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET name = ?, email = ? WHERE id = ? RETURNING {USER_COLUMNS}"
    ))
    .bind(req.name.trim())
    .bind(&email)
    .bind(user.id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_email_conflict(e, &email))?;

    Ok(updated)
}

pub async fn change_password(
    pool: &SqlitePool,
    user: &User,
    req: ChangePasswordRequest,
) -> Result<(), AppError> {
    if !verify_password(&req.current_password, &user.password)? {
        return Err(AppError::BadRequest("Current password is incorrect".to_string()));
    }

    let hashed = hash_password(&req.new_password)?;

    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(hashed)
        .bind(user.id)
        .execute(pool)
        .await?;

    tracing::info!(user_id = user.id, "Password changed");

    Ok(())
}

/// Deletes a user and everything that depends on it, in one transaction:
///
/// 1. subject links of the user;
/// 2. questions authored by the user, with their options;
/// 3. audit references to the user as subject are nulled (name kept);
/// 4. audit references to the user as admin are nulled (name kept);
/// 5. a DELETE audit entry naming the user is appended;
/// 6. the user row itself.
pub async fn delete_user(pool: &SqlitePool, admin: &User, target_id: i64) -> Result<(), AppError> {
    if admin.id == target_id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let mut tx = pool.begin().await?;

    let target = fetch_user_in(&mut tx, target_id).await?;

    let links = clear_subject_links(&mut tx, target.id).await?;

    sqlx::query(
        "DELETE FROM answer_options WHERE question_id IN (SELECT id FROM questions WHERE creator_id = ?)",
    )
    .bind(target.id)
    .execute(&mut *tx)
    .await?;

    let questions = sqlx::query("DELETE FROM questions WHERE creator_id = ?")
        .bind(target.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("UPDATE audit_logs SET user_id = NULL WHERE user_id = ?")
        .bind(target.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE audit_logs SET admin_id = NULL WHERE admin_id = ?")
        .bind(target.id)
        .execute(&mut *tx)
        .await?;

    audit::record(&mut tx, admin, None, &target.name, AuditAction::Delete).await?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(target.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit deletion of user {}: {:?}", target.id, e);
        AppError::from(e)
    })?;

    tracing::info!(
        user_id = target.id,
        admin_id = admin.id,
        links,
        questions,
        "User deleted with dependents"
    );

    Ok(())
}

/// Creates the bootstrap administrator from configuration if it does not exist yet.
pub async fn seed_admin(pool: &SqlitePool, config: &Config) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    if find_user_by_email(pool, email).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", email);
    let hashed_password = hash_password(password)?;

    sqlx::query("INSERT INTO users (name, email, password, role, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(&config.admin_name)
        .bind(normalize_email(email))
        .bind(hashed_password)
        .bind(Role::Admin.as_str())
        .bind(Utc::now())
        .execute(pool)
        .await?;

    tracing::info!("Admin user created successfully.");
    Ok(())
}
