// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Default length of an exam attempt, in minutes.
pub const DEFAULT_EXAM_DURATION_MINUTES: i64 = 60;

/// How long an abandoned session outlives its exam duration before the
/// store may reap it.
pub const SESSION_GRACE_MINUTES: i64 = 5;

/// Page size for admin question and result listings.
pub const ADMIN_PAGE_SIZE: i64 = 10;

/// Number of recent results shown on dashboards.
pub const RECENT_RESULTS_LIMIT: i64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub exam_duration_minutes: i64,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let exam_duration_minutes = env::var("EXAM_DURATION_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_EXAM_DURATION_MINUTES);

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            exam_duration_minutes,
            admin_username,
            admin_password,
        }
    }
}
