// src/services/mod.rs

pub mod account;
pub mod audit;
pub mod mailer;
pub mod question_view;
