use std::{str::FromStr, time::Duration};

lazy_static::lazy_static! {
    pub static ref API_URL: String = std::env::var("API_URL").unwrap_or_else(|_| String::from("localhost:5900"));

    /// HS256 key for bearer tokens
    pub static ref JWT_SECRET: String = std::env::var("JWT_SECRET").unwrap_or_else(|_| "secure jwt secret".to_string());

    /// Argon2 secret mixed into every password hash
    pub static ref SECRET_KEY: String = std::env::var("SECRET_KEY").unwrap_or_else(|_| "0123".repeat(8));

    pub static ref TOKEN_TTL_DAYS: i64 = env_or("TOKEN_TTL_DAYS", 7);

    /// Events buffered per subscriber before a slow one starts losing them
    pub static ref BROADCAST_CAPACITY: usize = env_or("BROADCAST_CAPACITY", 256);

    pub static ref REFRESH_INTERVAL: Duration = Duration::from_secs(env_or("REFRESH_INTERVAL_SECS", 30));

    /// Never below one, actix refuses a zero-worker server
    pub static ref SERVER_WORKERS: usize = positive_or("SERVER_WORKERS", 2);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreKind::Postgres),
            "memory" | "mem" => Ok(StoreKind::Memory),
            other => Err(format!("Unknown store '{}'", other)),
        }
    }
}

/// Store backend picked through `TODO_STORE`, Postgres unless told otherwise
pub fn store_kind() -> StoreKind {
    env_or("TODO_STORE", StoreKind::Postgres)
}

pub fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Reads and parses an env var, warning and falling back on garbage
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Like `env_or`, but a zero is raised to one
fn positive_or(key: &str, default: usize) -> usize {
    env_or(key, default).max(1)
}
