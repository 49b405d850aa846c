// src/models/professor_subject.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'professor_subjects' link table.
/// The pair (professor_id, subject_id) is the primary key.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProfessorSubject {
    pub professor_id: i64,
    pub subject_id: i64,
}

/// A link joined with the subject it points to.
#[derive(Debug, Serialize, FromRow)]
pub struct ProfessorSubjectView {
    pub professor_id: i64,
    pub subject_id: i64,
    pub subject_name: String,
}
