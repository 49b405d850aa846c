// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// Maximum length (in characters) of the title derived from the statement.
pub const TITLE_MAX_CHARS: usize = 50;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: i64,

    /// First `TITLE_MAX_CHARS` characters of `body`.
    pub title: String,

    /// The full question statement.
    pub body: String,

    pub difficulty: String,

    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: String,

    pub subject_id: Option<i64>,

    pub creator_id: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    Essay,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "MULTIPLE_CHOICE",
            QuestionType::TrueFalse => "TRUE_FALSE",
            QuestionType::Essay => "ESSAY",
        }
    }

    /// Parses the value stored in `questions.type`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MULTIPLE_CHOICE" => Some(QuestionType::MultipleChoice),
            "TRUE_FALSE" => Some(QuestionType::TrueFalse),
            "ESSAY" => Some(QuestionType::Essay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }
}

/// One option as submitted by the authoring form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OptionInput {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Flattened DTO for creating or replacing a question together with its options.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
    pub difficulty: Difficulty,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub subject_id: Option<i64>,
    /// Defaults to the caller. Only admins may author on behalf of someone else.
    pub creator_id: Option<i64>,
    #[serde(default)]
    #[validate(nested)]
    pub options: Vec<OptionInput>,
}

impl QuestionRequest {
    /// Checks that the submitted option list fits the question type.
    pub fn check_options(&self) -> Result<(), AppError> {
        let correct: Vec<bool> = self.options.iter().map(|o| o.is_correct).collect();
        check_option_rules(self.question_type, &correct)
    }
}

/// Option rules per question type, given the `is_correct` flag of every option.
///
/// MULTIPLE_CHOICE: two or more options, exactly one correct.
/// TRUE_FALSE: exactly two options, one correct. ESSAY: none.
pub fn check_option_rules(question_type: QuestionType, correct: &[bool]) -> Result<(), AppError> {
    let correct_count = correct.iter().filter(|c| **c).count();

    match question_type {
        QuestionType::MultipleChoice => {
            if correct.len() < 2 {
                return Err(AppError::BadRequest(
                    "Multiple choice questions need at least two options".to_string(),
                ));
            }
            if correct_count != 1 {
                return Err(AppError::BadRequest(
                    "Exactly one option must be marked as correct".to_string(),
                ));
            }
        }
        QuestionType::TrueFalse => {
            if correct.len() != 2 || correct_count != 1 {
                return Err(AppError::BadRequest(
                    "True/false questions need two options, one of them correct".to_string(),
                ));
            }
        }
        QuestionType::Essay => {
            if !correct.is_empty() {
                return Err(AppError::BadRequest(
                    "Essay questions do not take options".to_string(),
                ));
            }
        }
    }

    Ok(())
}

/// Derives the question title from its statement.
pub fn derive_title(body: &str) -> String {
    body.chars().take(TITLE_MAX_CHARS).collect()
}

/// An option inside the flattened question view.
#[derive(Debug, Clone, Serialize)]
pub struct OptionView {
    pub id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// Flattened question as shown by the browse and edit screens.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub difficulty: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
    pub creator_id: i64,
    pub creator_name: String,
    pub options: Vec<OptionView>,
    /// Text of the first correct option, if any.
    pub correct_answer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Question counts per type, for the dashboard cards.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct QuestionStats {
    pub total: i64,
    pub multiple_choice: i64,
    pub true_false: i64,
    pub essay: i64,
}
