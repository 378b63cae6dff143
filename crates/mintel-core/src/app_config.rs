use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How the intake endpoint establishes the caller's identity.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Verify an HS256 signature and the `exp` claim with this secret.
    Hs256 { secret: String },
    /// Read `sub` without verifying; an upstream gateway already checked it.
    TrustUpstream,
    /// Neither mode configured. Intake answers 500.
    Unconfigured,
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::Hs256 { .. } => f.write_str("Hs256([redacted])"),
            AuthMode::TrustUpstream => f.write_str("TrustUpstream"),
            AuthMode::Unconfigured => f.write_str("Unconfigured"),
        }
    }
}

/// Settings for the messages API.
#[derive(Clone, PartialEq)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    /// Escalated budgets on retry never exceed this.
    pub max_tokens_ceiling: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("max_tokens_ceiling", &self.max_tokens_ceiling)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// When set, intake POSTs here instead of spawning the worker in-process.
    pub trigger_url: Option<String>,
    /// Bearer token sent with remote triggers.
    pub service_key: Option<String>,
    pub poll_cron: String,
    pub job_timeout_secs: u64,
    pub claim_stale_after_secs: u64,
}

impl std::fmt::Debug for WorkerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerSettings")
            .field("trigger_url", &self.trigger_url)
            .field(
                "service_key",
                &self.service_key.as_ref().map(|_| "[redacted]"),
            )
            .field("poll_cron", &self.poll_cron)
            .field("job_timeout_secs", &self.job_timeout_secs)
            .field("claim_stale_after_secs", &self.claim_stale_after_secs)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub youtube_api_key: Option<String>,
    pub http_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub auth: AuthMode,
    pub llm: LlmSettings,
    pub worker: WorkerSettings,
}

impl AppConfig {
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.env == Environment::Development
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "youtube_api_key",
                &self.youtube_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("auth", &self.auth)
            .field("llm", &self.llm)
            .field("worker", &self.worker)
            .finish()
    }
}
