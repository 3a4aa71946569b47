use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// One day.
const MAX_GRACE_MINUTES: i64 = 24 * 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,
    pub rate_device_per_min: u32,

    pub api_prefix: String,

    /// Prefix prepended to stored image paths in responses
    pub base_url: String,
    pub storage_dir: String,
    pub max_upload_bytes: usize,

    /// Minutes after `time_in` an arrival still counts as on time (0..=1440)
    pub late_grace_minutes: i64,

    pub log_dir: String,
    pub db_max_connections: u32,

    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} must be set"))
        };

        let late_grace_minutes: i64 = parse_or(&lookup, "LATE_GRACE_MINUTES", 0)?;
        if !(0..=MAX_GRACE_MINUTES).contains(&late_grace_minutes) {
            return Err(anyhow!(
                "LATE_GRACE_MINUTES must be between 0 and {MAX_GRACE_MINUTES}, got {late_grace_minutes}"
            ));
        }

        let api_prefix = lookup("API_PREFIX").unwrap_or_else(|| "/api/v1".to_string());
        if !api_prefix.starts_with('/') {
            return Err(anyhow!("API_PREFIX must start with '/'"));
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or(&lookup, "ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parse_or(&lookup, "REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parse_or(&lookup, "RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: parse_or(&lookup, "RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,
            rate_device_per_min: parse_or(&lookup, "RATE_DEVICE_PER_MIN", 6000)?,

            api_prefix: api_prefix.trim_end_matches('/').to_string(),

            base_url: required("BASE_URL")?.trim_end_matches('/').to_string(),
            storage_dir: lookup("STORAGE_DIR").unwrap_or_else(|| "storage".to_string()),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,

            late_grace_minutes,

            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 20)?,

            admin_email: lookup("ADMIN_EMAIL").filter(|v| !v.trim().is_empty()),
            admin_password: lookup("ADMIN_PASSWORD").filter(|v| !v.is_empty()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("SERVER_ADDR", "127.0.0.1:8080"),
        ("DATABASE_URL", "mysql://localhost/hr"),
        ("JWT_SECRET", "secret"),
        ("BASE_URL", "http://localhost:8080/"),
    ];

    #[test]
    fn defaults_are_applied() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.access_token_ttl, 900);
        assert_eq!(config.refresh_token_ttl, 604_800);
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.storage_dir, "storage");
        assert_eq!(config.late_grace_minutes, 0);
        assert_eq!(config.db_max_connections, 20);
        assert!(config.admin_email.is_none());
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn missing_required_variable_is_reported() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_number_names_the_variable() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LATE_GRACE_MINUTES", "five"));

        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("LATE_GRACE_MINUTES"));
    }

    #[test]
    fn grace_minutes_outside_one_day_are_rejected() {
        for raw in ["-1", "1441", "9223372036854775807"] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push(("LATE_GRACE_MINUTES", raw));

            let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert!(err.to_string().contains("LATE_GRACE_MINUTES"), "{raw}");
        }

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LATE_GRACE_MINUTES", "1440"));
        assert_eq!(Config::from_lookup(lookup_from(&pairs)).unwrap().late_grace_minutes, 1440);
    }

    #[test]
    fn api_prefix_must_be_absolute() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("API_PREFIX", "api"));

        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}
