use crate::app_config::{AppConfig, Environment};
use crate::{ConfigError, DEFAULT_SNAPSHOT_WINDOW_DAYS, MAX_SNAPSHOT_BATCH_SIZE};

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let api_key_hash_salt = lookup("POSTPULSE_API_KEY_HASH_SALT").ok();

    let env = parse_environment(&or_default("POSTPULSE_ENV", "development"))?;

    let bind_addr = parse_addr("POSTPULSE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("POSTPULSE_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("POSTPULSE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("POSTPULSE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("POSTPULSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let snapshot_window_days = parse_u32(
        "POSTPULSE_SNAPSHOT_WINDOW_DAYS",
        &DEFAULT_SNAPSHOT_WINDOW_DAYS.to_string(),
    )?;
    if snapshot_window_days == 0 {
        return Err(invalid(
            "POSTPULSE_SNAPSHOT_WINDOW_DAYS",
            "window must be at least one day".to_string(),
        ));
    }

    let snapshot_batch_size = parse_usize(
        "POSTPULSE_SNAPSHOT_BATCH_SIZE",
        &MAX_SNAPSHOT_BATCH_SIZE.to_string(),
    )?;
    if snapshot_batch_size == 0 || snapshot_batch_size > MAX_SNAPSHOT_BATCH_SIZE {
        return Err(invalid(
            "POSTPULSE_SNAPSHOT_BATCH_SIZE",
            format!("batch size must be between 1 and {MAX_SNAPSHOT_BATCH_SIZE}"),
        ));
    }

    let snapshot_refresh_cron =
        parse_refresh_cron(&or_default("POSTPULSE_SNAPSHOT_REFRESH_CRON", "0 0 4 * * *"));

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        api_key_hash_salt,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        snapshot_window_days,
        snapshot_batch_size,
        snapshot_refresh_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "POSTPULSE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// `off`, `none`, `disabled` or an empty value turn the scheduled refresh off.
fn parse_refresh_cron(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" | "off" | "none" | "disabled" => None,
        _ => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
