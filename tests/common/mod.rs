// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use easyquiz::{
    config::Config,
    error::AppError,
    routes,
    services::{
        account,
        mailer::{Mailer, OutgoingMail},
    },
    state::AppState,
};
use serde_json::{Value, json};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub const ADMIN_EMAIL: &str = "admin@easyquiz.test";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const ADMIN_NAME: &str = "Root Admin";

/// Keeps every message instead of delivering it.
/// With `fail` set, each send is still recorded but reports a relay error.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<OutgoingMail>>>,
    pub fail: Arc<AtomicBool>,
}

impl RecordingMailer {
    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(mail.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError("Mail relay answered 503".to_string()));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub mailer: RecordingMailer,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port, backed by a fresh in-memory database
/// that already holds the bootstrap admin.
pub async fn spawn_app() -> TestApp {
    // One connection that never expires: each in-memory connection is its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        admin_name: ADMIN_NAME.to_string(),
        mail_relay_url: None,
        mail_from: "no-reply@easyquiz.test".to_string(),
    };

    account::seed_admin(&pool, &config)
        .await
        .expect("Failed to seed admin");

    let mailer = RecordingMailer::default();
    let state = AppState {
        pool: pool.clone(),
        config,
        mailer: Arc::new(mailer.clone()),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        mailer,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn token_for(&self, email: &str, password: &str) -> String {
        let resp = self.login(email, password).await;
        assert_eq!(resp.status().as_u16(), 200, "login failed for {}", email);
        let body: Value = resp.json().await.unwrap();
        body["token"].as_str().expect("Token not found").to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn create_subject(&self, token: &str, name: &str) -> i64 {
        let resp = self.post(token, "/disciplina", json!({ "name": name })).await;
        assert_eq!(resp.status().as_u16(), 201);
        let body: Value = resp.json().await.unwrap();
        body["id"].as_i64().unwrap()
    }

    /// Waits for the background welcome mail and returns the password it carries.
    pub async fn password_mailed_to(&self, email: &str) -> String {
        for _ in 0..100 {
            let found = self
                .mailer
                .sent
                .lock()
                .unwrap()
                .iter()
                .find(|m| m.to == email)
                .cloned();

            if let Some(mail) = found {
                let line = mail
                    .body
                    .lines()
                    .find(|l| l.starts_with("Password: "))
                    .expect("Mail carries no password");
                return line.trim_start_matches("Password: ").to_string();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("No mail sent to {}", email);
    }

    /// Creates an account as `admin_token` and returns (id, generated password).
    pub async fn create_user(
        &self,
        admin_token: &str,
        name: &str,
        email: &str,
        role: &str,
        subject_ids: &[i64],
    ) -> (i64, String) {
        let resp = self
            .post(
                admin_token,
                "/usuarios",
                json!({
                    "name": name,
                    "email": email,
                    "role": role,
                    "subject_ids": subject_ids
                }),
            )
            .await;
        assert_eq!(resp.status().as_u16(), 201);
        let body: Value = resp.json().await.unwrap();
        let id = body["id"].as_i64().unwrap();
        let password = self.password_mailed_to(email).await;
        (id, password)
    }

    pub async fn count(&self, sql: &str, bind: i64) -> i64 {
        sqlx::query_scalar(sql)
            .bind(bind)
            .fetch_one(&self.pool)
            .await
            .expect("Count query failed")
    }

    pub async fn count_all(&self, sql: &str) -> i64 {
        sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .expect("Count query failed")
    }
}
