// src/handlers/mod.rs

pub mod answer_option;
pub mod audit_log;
pub mod auth;
pub mod professor_subject;
pub mod question;
pub mod subject;
pub mod user;
