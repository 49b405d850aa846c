// src/models/mod.rs

pub mod answer_option;
pub mod audit_log;
pub mod professor_subject;
pub mod question;
pub mod subject;
pub mod user;
