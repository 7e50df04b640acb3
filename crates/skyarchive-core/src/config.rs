use std::path::PathBuf;

use crate::app_config::AppConfig;
use crate::ConfigError;

const PLACEHOLDER_HANDLE: &str = "your_login_handle.bsky.social";
const PLACEHOLDER_PASSWORD: &str = "xxxx-xxxx-xxxx-xxxx";

/// The feed endpoint refuses page sizes above this.
const MAX_PAGE_LIMIT: u32 = 100;

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

/// Build configuration using the provided env-var lookup function.
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
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let login_handle = require("SKYARCHIVE_HANDLE")?;
    if login_handle == PLACEHOLDER_HANDLE {
        return Err(ConfigError::PlaceholderCredentials(
            "SKYARCHIVE_HANDLE".to_string(),
        ));
    }
    let app_password = require("SKYARCHIVE_APP_PASSWORD")?;
    if app_password == PLACEHOLDER_PASSWORD {
        return Err(ConfigError::PlaceholderCredentials(
            "SKYARCHIVE_APP_PASSWORD".to_string(),
        ));
    }

    let service_url = or_default("SKYARCHIVE_SERVICE_URL", "https://bsky.social");
    let output_dir = PathBuf::from(or_default("SKYARCHIVE_OUTPUT_DIR", "."));
    let log_level = or_default("SKYARCHIVE_LOG_LEVEL", "info");
    let user_agent = or_default(
        "SKYARCHIVE_USER_AGENT",
        "skyarchive/0.1 (profile-archiver)",
    );

    let page_limit = parse_u32("SKYARCHIVE_PAGE_LIMIT", "100")?;
    if page_limit == 0 || page_limit > MAX_PAGE_LIMIT {
        return Err(ConfigError::InvalidEnvVar {
            var: "SKYARCHIVE_PAGE_LIMIT".to_string(),
            reason: format!("must be between 1 and {MAX_PAGE_LIMIT}, got {page_limit}"),
        });
    }
    let page_delay_ms = parse_u64("SKYARCHIVE_PAGE_DELAY_MS", "1000")?;
    let rate_limit_cooldown_secs = parse_u64("SKYARCHIVE_RATE_LIMIT_COOLDOWN_SECS", "60")?;
    let max_rate_limit_waits = match lookup("SKYARCHIVE_MAX_RATE_LIMIT_WAITS") {
        Ok(raw) if !raw.trim().is_empty() => {
            Some(raw.trim().parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
                var: "SKYARCHIVE_MAX_RATE_LIMIT_WAITS".to_string(),
                reason: e.to_string(),
            })?)
        }
        _ => None,
    };
    let media_delay_ms = parse_u64("SKYARCHIVE_MEDIA_DELAY_MS", "500")?;
    let media_probe_timeout_secs = parse_u64("SKYARCHIVE_MEDIA_PROBE_TIMEOUT_SECS", "5")?;
    let media_download_timeout_secs = parse_u64("SKYARCHIVE_MEDIA_DOWNLOAD_TIMEOUT_SECS", "20")?;

    Ok(AppConfig {
        login_handle,
        app_password,
        service_url,
        output_dir,
        log_level,
        user_agent,
        page_limit,
        page_delay_ms,
        rate_limit_cooldown_secs,
        max_rate_limit_waits,
        media_delay_ms,
        media_probe_timeout_secs,
        media_download_timeout_secs,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
