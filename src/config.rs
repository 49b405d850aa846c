// src/config.rs

use std::env;
use dotenvy::dotenv;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,

    /// Bootstrap administrator, seeded on startup when both are set.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: String,

    /// HTTP relay that delivers outgoing mail. Mail is only logged when unset.
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://easyquiz.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let mail_relay_url = env::var("MAIL_RELAY_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        if let Some(relay) = &mail_relay_url {
            if Url::parse(relay).is_err() {
                panic!("MAIL_RELAY_URL is not a valid URL: {}", relay);
            }
        }

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            admin_name: env::var("ADMIN_NAME")
                .unwrap_or_else(|_| "Administrator".to_string()),
            mail_relay_url,
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@easyquiz.local".to_string()),
        }
    }
}
