use std::{env, fmt::Display, str::FromStr};

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::attendance::policy::AttendancePolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub log_level: String,

    /// Weekday, time-of-day window and local offset for check-ins
    pub attendance: AttendancePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let attendance = AttendancePolicy::parse(
            &var_or("ATTENDANCE_WEEKDAY", "Sun"),
            &var_or("ATTENDANCE_WINDOW_START", "08:30"),
            &var_or("ATTENDANCE_WINDOW_END", "12:00"),
            &var_or("ATTENDANCE_UTC_OFFSET", "+07:00"),
        )
        .context("invalid ATTENDANCE_* configuration")?;

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 86_400)?, // 1 day

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parsed_or("RATE_REGISTER_PER_MIN", 30)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: var_or("API_PREFIX", "/api"),

            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout_secs: parsed_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            log_level: var_or("LOG_LEVEL", "debug"),

            attendance,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| anyhow!("{key} must be set"))
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for in-process tests; no environment is read.
    pub fn for_tests(attendance: AttendancePolicy) -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 3600,
            rate_login_per_min: 10_000,
            rate_register_per_min: 10_000,
            rate_protected_per_min: 10_000,
            api_prefix: "/api".to_string(),
            db_max_connections: 1,
            db_acquire_timeout_secs: 1,
            log_level: "debug".to_string(),
            attendance,
        }
    }
}
