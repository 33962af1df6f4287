use crate::app_config::{AppConfig, Environment, ALLOWED_PAGE_SIZES};
use crate::ConfigError;

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
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
        }
    };

    let base_url = require("AWRC_BASE_URL")?;
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(invalid(
            "AWRC_BASE_URL",
            format!("\"{base_url}\" must start with http:// or https://"),
        ));
    }

    let env = parse_environment(&or_default("AWRC_ENV", "development"))?;
    let log_level = or_default("AWRC_LOG_LEVEL", "info");
    let auth_cookie = lookup("AWRC_AUTH_COOKIE").ok().filter(|v| !v.is_empty());
    let public_templates = parse_bool("AWRC_PUBLIC_TEMPLATES", "false")?;
    let request_timeout_secs = parse_u64("AWRC_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("AWRC_USER_AGENT", "awrc/0.1 (reporting-console)");

    let poll_interval_ms = parse_u64("AWRC_POLL_INTERVAL_MS", "2000")?;
    if poll_interval_ms == 0 {
        return Err(invalid(
            "AWRC_POLL_INTERVAL_MS",
            "must be greater than zero".to_string(),
        ));
    }

    let page_size = or_default("AWRC_PAGE_SIZE", "10")
        .parse::<usize>()
        .map_err(|e| invalid("AWRC_PAGE_SIZE", e.to_string()))?;
    if !ALLOWED_PAGE_SIZES.contains(&page_size) {
        return Err(invalid(
            "AWRC_PAGE_SIZE",
            format!("{page_size} is not one of {ALLOWED_PAGE_SIZES:?}"),
        ));
    }

    Ok(AppConfig {
        env,
        base_url,
        log_level,
        auth_cookie,
        public_templates,
        request_timeout_secs,
        user_agent,
        poll_interval_ms,
        page_size,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "AWRC_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
