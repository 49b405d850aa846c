// src/services/question_view.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::AppError,
    models::{
        answer_option::AnswerOption,
        question::{OptionView, QuestionStats, QuestionType, QuestionView},
    },
};

/// Which questions to assemble.
#[derive(Debug, Clone, Copy)]
pub enum QuestionFilter {
    All,
    Id(i64),
    Creator(i64),
    Subject(i64),
}

/// A question joined with its subject and creator names.
#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    title: String,
    body: String,
    difficulty: String,
    question_type: String,
    subject_id: Option<i64>,
    subject_name: Option<String>,
    creator_id: i64,
    creator_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Loads flattened question views, options included, in two queries.
pub async fn load(pool: &SqlitePool, filter: QuestionFilter) -> Result<Vec<QuestionView>, AppError> {
    let mut query_builder = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT
            q.id, q.title, q.body, q.difficulty, q.type AS question_type,
            q.subject_id, s.name AS subject_name,
            q.creator_id, u.name AS creator_name,
            q.created_at, q.updated_at
        FROM questions q
        JOIN users u ON u.id = q.creator_id
        LEFT JOIN subjects s ON s.id = q.subject_id
        "#,
    );

    match filter {
        QuestionFilter::All => {}
        QuestionFilter::Id(id) => {
            query_builder.push(" WHERE q.id = ").push_bind(id);
        }
        QuestionFilter::Creator(creator_id) => {
            query_builder.push(" WHERE q.creator_id = ").push_bind(creator_id);
        }
        QuestionFilter::Subject(subject_id) => {
            query_builder.push(" WHERE q.subject_id = ").push_bind(subject_id);
        }
    }
    query_builder.push(" ORDER BY q.id DESC");

    let rows: Vec<QuestionRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load questions: {:?}", e);
            AppError::from(e)
        })?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    // Use QueryBuilder for dynamic IN clause
    let mut options_builder = QueryBuilder::<Sqlite>::new(
        "SELECT id, question_id, text, is_correct FROM answer_options WHERE question_id IN (",
    );
    let mut separated = options_builder.separated(",");
    for row in &rows {
        separated.push_bind(row.id);
    }
    separated.push_unseparated(") ORDER BY id");

    let options: Vec<AnswerOption> = options_builder
        .build_query_as()
        .fetch_all(pool)
        .await?;

    let mut by_question: HashMap<i64, Vec<OptionView>> = HashMap::new();
    for option in options {
        by_question
            .entry(option.question_id)
            .or_default()
            .push(OptionView {
                id: option.id,
                text: option.text,
                is_correct: option.is_correct,
            });
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let options = by_question.remove(&row.id).unwrap_or_default();
            assemble(row, options)
        })
        .collect())
}

fn assemble(row: QuestionRow, options: Vec<OptionView>) -> QuestionView {
    let correct_answer = options
        .iter()
        .find(|o| o.is_correct)
        .map(|o| o.text.clone());

    QuestionView {
        id: row.id,
        title: row.title,
        body: row.body,
        difficulty: row.difficulty,
        question_type: row.question_type,
        subject_id: row.subject_id,
        subject_name: row.subject_name,
        creator_id: row.creator_id,
        creator_name: row.creator_name,
        options,
        correct_answer,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub async fn load_one(pool: &SqlitePool, id: i64) -> Result<QuestionView, AppError> {
    load(pool, QuestionFilter::Id(id))
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::NotFound("Question not found".to_string()))
}

/// Counts questions per type, optionally restricted to one creator.
pub async fn stats(pool: &SqlitePool, creator_id: Option<i64>) -> Result<QuestionStats, AppError> {
    let counts: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT type, COUNT(*)
        FROM questions
        WHERE (? IS NULL OR creator_id = ?)
        GROUP BY type
        "#,
    )
    .bind(creator_id)
    .bind(creator_id)
    .fetch_all(pool)
    .await?;

    let mut stats = QuestionStats::default();
    for (question_type, count) in counts {
        stats.total += count;
        if question_type == QuestionType::MultipleChoice.as_str() {
            stats.multiple_choice = count;
        } else if question_type == QuestionType::TrueFalse.as_str() {
            stats.true_false = count;
        } else if question_type == QuestionType::Essay.as_str() {
            stats.essay = count;
        }
    }

    Ok(stats)
}
