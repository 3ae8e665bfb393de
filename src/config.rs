use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::info;

use crate::moderation::{Blocklist, GateLimits, ThrottleConfig};

/// Terms blocked when neither `STEWARD_BLOCKLIST` nor `STEWARD_BLOCKLIST_FILE`
/// is set.
pub const DEFAULT_BLOCKLIST: &[&str] = &["fuck", "fucking", "cunt"];

/// Configuration for the forum steward service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StewardConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Blocklist and field limits
    pub moderation: ModerationConfig,
    /// Submission throttle
    pub throttle: ThrottleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8780,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,
    /// Enable PostgreSQL (if false, uses the in-memory store)
    pub postgres_enabled: bool,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: "postgresql://localhost:5432/forum_steward".to_string(),
            postgres_enabled: false,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Enable request/response logging
    pub log_requests: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_requests: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub blocklist: Vec<String>,
    pub limits: GateLimits,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            blocklist: DEFAULT_BLOCKLIST.iter().map(|t| t.to_string()).collect(),
            limits: GateLimits::default(),
        }
    }
}

impl ModerationConfig {
    pub fn build_blocklist(&self) -> Result<Blocklist> {
        Blocklist::new(&self.blocklist).context("Invalid blocklist term")
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid {} value", key))
        })
        .transpose()
}

/// Terms from a blocklist file: one per line, `#` starts a comment.
pub fn parse_blocklist(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_blocklist_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read blocklist file {}", path.display()))?;
    Ok(parse_blocklist(&contents))
}

impl StewardConfig {
    /// Load configuration from `STEWARD_*` environment variables and validate
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) against any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        // Server configuration
        if let Some(host) = lookup("STEWARD_HOST") {
            config.server.host = host;
        }
        if let Some(port) = parse_var(&lookup, "STEWARD_PORT")? {
            config.server.port = port;
        }

        // Database configuration
        if let Some(url) = lookup("STEWARD_POSTGRES_URL") {
            config.database.postgres_url = url;
        }
        if let Some(enabled) = parse_var(&lookup, "STEWARD_POSTGRES_ENABLED")? {
            config.database.postgres_enabled = enabled;
        }
        if let Some(max) = parse_var(&lookup, "STEWARD_POSTGRES_MAX_CONNECTIONS")? {
            config.database.max_connections = max;
        }

        // Logging configuration
        if let Some(level) = lookup("STEWARD_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(log_requests) = parse_var(&lookup, "STEWARD_LOG_REQUESTS")? {
            config.logging.log_requests = log_requests;
        }

        // Blocklist: file wins over inline list
        if let Some(path) = lookup("STEWARD_BLOCKLIST_FILE") {
            config.moderation.blocklist = load_blocklist_file(&path)?;
            info!(path = %path, terms = config.moderation.blocklist.len(), "Loaded blocklist file");
        } else if let Some(terms) = lookup("STEWARD_BLOCKLIST") {
            config.moderation.blocklist = terms
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }

        // Field limits
        let limits = &mut config.moderation.limits;
        if let Some(v) = parse_var(&lookup, "STEWARD_TITLE_MIN_CHARS")? {
            limits.title_min_chars = v;
        }
        if let Some(v) = parse_var(&lookup, "STEWARD_TITLE_MAX_CHARS")? {
            limits.title_max_chars = v;
        }
        if let Some(v) = parse_var(&lookup, "STEWARD_CONTENT_MIN_CHARS")? {
            limits.content_min_chars = v;
        }
        if let Some(v) = parse_var(&lookup, "STEWARD_CONTENT_MAX_CHARS")? {
            limits.content_max_chars = v;
        }

        // Throttle
        if let Some(v) = parse_var(&lookup, "STEWARD_THROTTLE_WINDOW_SECS")? {
            config.throttle.window_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "STEWARD_THROTTLE_MAX_SUBMISSIONS")? {
            config.throttle.max_submissions = v;
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        if self.database.postgres_enabled {
            if self.database.postgres_url.is_empty() {
                return Err(anyhow::anyhow!(
                    "STEWARD_POSTGRES_URL is required when PostgreSQL is enabled"
                ));
            }
            if self.database.max_connections == 0 {
                return Err(anyhow::anyhow!("Database pool needs at least one connection"));
            }
        }

        let limits = &self.moderation.limits;
        if limits.title_min_chars > limits.title_max_chars {
            return Err(anyhow::anyhow!(
                "Title minimum ({}) exceeds maximum ({})",
                limits.title_min_chars,
                limits.title_max_chars
            ));
        }
        if limits.content_min_chars > limits.content_max_chars {
            return Err(anyhow::anyhow!(
                "Content minimum ({}) exceeds maximum ({})",
                limits.content_min_chars,
                limits.content_max_chars
            ));
        }

        if self.throttle.window_secs == 0 || self.throttle.max_submissions == 0 {
            return Err(anyhow::anyhow!(
                "Throttle window and submission limit must be non-zero"
            ));
        }

        self.moderation.build_blocklist()?;

        Ok(())
    }
}

/// Hide the password in a connection string before logging it
pub fn sanitize_database_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}
