use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("TIENDA_ENV", "development"))?;

    let api_url = or_default("TIENDA_API_URL", "http://127.0.0.1:8000/clientes/api/");
    if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "TIENDA_API_URL".to_string(),
            reason: format!("expected an http(s) URL, got '{api_url}'"),
        });
    }

    let log_level = or_default("TIENDA_LOG_LEVEL", "info");
    let storage_path = PathBuf::from(or_default("TIENDA_STORAGE_PATH", "./.tienda/storage.json"));
    let request_timeout_secs = parse_u64("TIENDA_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("TIENDA_USER_AGENT", "tienda/0.1 (storefront)");
    let payment_delay_ms = parse_u64("TIENDA_PAYMENT_DELAY_MS", "2500")?;
    let pending_purchase_ttl_mins = parse_u64("TIENDA_PENDING_PURCHASE_TTL_MINS", "30")?;

    Ok(AppConfig {
        env,
        api_url,
        log_level,
        storage_path,
        request_timeout_secs,
        user_agent,
        payment_delay_ms,
        pending_purchase_ttl_mins,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TIENDA_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
