use crate::app_config::{AppConfig, AuthMode, Environment, LlmSettings, WorkerSettings};
use crate::ConfigError;

/// Browser-like UA default; Instagram serves stripped pages to obvious bots.
pub const DEFAULT_SCRAPER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

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
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Empty values count as unset for optional variables.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let require = |var: &str| -> Result<String, ConfigError> {
        optional(var).ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
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

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("MINTEL_ENV", "development"));

    let bind_addr = or_default("MINTEL_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("MINTEL_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("MINTEL_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("MINTEL_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("MINTEL_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("MINTEL_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "MINTEL_DB_MIN_CONNECTIONS",
            format!(
                "{db_min_connections} exceeds MINTEL_DB_MAX_CONNECTIONS ({db_max_connections})"
            ),
        ));
    }

    let youtube_api_key = optional("YOUTUBE_API_KEY");
    let http_timeout_secs = parse_u64("MINTEL_HTTP_TIMEOUT_SECS", "30")?;
    let scraper_user_agent = or_default("MINTEL_SCRAPER_USER_AGENT", DEFAULT_SCRAPER_USER_AGENT);

    let auth = match optional("MINTEL_JWT_SECRET") {
        Some(secret) => AuthMode::Hs256 { secret },
        None if parse_bool("MINTEL_TRUST_UPSTREAM_AUTH", "false")? => AuthMode::TrustUpstream,
        None => AuthMode::Unconfigured,
    };

    let max_tokens = parse_u32("MINTEL_LLM_MAX_TOKENS", "4096")?;
    let max_tokens_ceiling = parse_u32("MINTEL_LLM_MAX_TOKENS_CEILING", "8192")?;
    if max_tokens == 0 || max_tokens_ceiling < max_tokens {
        return Err(invalid(
            "MINTEL_LLM_MAX_TOKENS_CEILING",
            format!(
                "ceiling {max_tokens_ceiling} must be non-zero and >= \
                 MINTEL_LLM_MAX_TOKENS ({max_tokens})"
            ),
        ));
    }
    let temperature = or_default("MINTEL_LLM_TEMPERATURE", "0.2")
        .parse::<f32>()
        .map_err(|e| invalid("MINTEL_LLM_TEMPERATURE", e.to_string()))?;
    if !(0.0..=1.0).contains(&temperature) {
        return Err(invalid(
            "MINTEL_LLM_TEMPERATURE",
            format!("{temperature} is outside 0.0..=1.0"),
        ));
    }

    let llm = LlmSettings {
        api_key: optional("ANTHROPIC_API_KEY"),
        model: or_default("MINTEL_LLM_MODEL", "claude-sonnet-4-6"),
        max_tokens,
        max_tokens_ceiling,
        temperature,
        timeout_secs: parse_u64("MINTEL_LLM_TIMEOUT_SECS", "120")?,
    };

    let job_timeout_secs = parse_u64("MINTEL_WORKER_JOB_TIMEOUT_SECS", "600")?;
    if job_timeout_secs == 0 {
        return Err(invalid(
            "MINTEL_WORKER_JOB_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    // A claim younger than the job timeout may belong to a live job.
    let claim_stale_after_secs = parse_u64("MINTEL_CLAIM_STALE_AFTER_SECS", "1800")?;
    if claim_stale_after_secs <= job_timeout_secs {
        return Err(invalid(
            "MINTEL_CLAIM_STALE_AFTER_SECS",
            format!(
                "{claim_stale_after_secs} must exceed \
                 MINTEL_WORKER_JOB_TIMEOUT_SECS ({job_timeout_secs})"
            ),
        ));
    }

    let worker = WorkerSettings {
        trigger_url: optional("MINTEL_WORKER_TRIGGER_URL"),
        service_key: optional("MINTEL_WORKER_SERVICE_KEY"),
        poll_cron: or_default("MINTEL_WORKER_POLL_CRON", "0 * * * * *"),
        job_timeout_secs,
        claim_stale_after_secs,
    };

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        youtube_api_key,
        http_timeout_secs,
        scraper_user_agent,
        auth,
        llm,
        worker,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
