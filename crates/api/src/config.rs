use relflow_core::enums::{UpdateRequest, UpdateStatus};
use relflow_core::metrics::DEFAULT_METRICS_PREFIX;
use relflow_core::obsoletion::ObsoletionPolicy;
use relflow_core::requirements::RequirementSettings;

use crate::auth::jwt::JwtConfig;

/// A malformed or missing configuration value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be set")]
    Missing { key: &'static str },

    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Parse `key` from `lookup`, falling back to `default` when unset.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Parse a comma-separated list from `key`, falling back to `default`.
fn list_or<T, E>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Vec<T>,
    parse: fn(&str) -> Result<T, E>,
) -> Result<Vec<T>, ConfigError>
where
    E: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            parse(s).map_err(|e| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Grace period for in-flight requests after a shutdown signal (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Promotion thresholds, obsoletion policy and metrics defaults.
    pub workflow: WorkflowConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&lookup, "PORT", 3000u16)?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?;
        let shutdown_timeout_secs = parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30u64)?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_lookup(&lookup)?,
            workflow: WorkflowConfig::from_lookup(&lookup)?,
        })
    }
}

/// Workflow policy knobs, read once at startup.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub requirements: RequirementSettings,
    pub obsoletion: ObsoletionPolicy,
    /// Release-name prefix used when `/metrics` gets no `prefix` parameter.
    pub metrics_prefix: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            requirements: RequirementSettings::default(),
            obsoletion: ObsoletionPolicy::default(),
            metrics_prefix: DEFAULT_METRICS_PREFIX.to_string(),
        }
    }
}

impl WorkflowConfig {
    /// | Env Var                            | Default            |
    /// |------------------------------------|--------------------|
    /// | `RELFLOW_MIN_KARMA`                | `3`                |
    /// | `RELFLOW_MIN_DAYS_IN_TESTING`      | `7`                |
    /// | `RELFLOW_CRITPATH_MIN_KARMA`       | `3`                |
    /// | `RELFLOW_CRITPATH_MIN_DAYS`        | `14`               |
    /// | `RELFLOW_REQUIRE_PASSING_TESTS`    | `false`            |
    /// | `RELFLOW_OBSOLETE_STATUSES`        | `pending,testing`  |
    /// | `RELFLOW_OBSOLETE_IMMUNE_REQUESTS` | `stable`           |
    /// | `RELFLOW_OBSOLETE_SKIP_LOCKED`     | `true`             |
    /// | `RELFLOW_METRICS_PREFIX`           | `F`                |
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = RequirementSettings::default();
        let requirements = RequirementSettings {
            min_karma: parse_or(lookup, "RELFLOW_MIN_KARMA", defaults.min_karma)?,
            min_days_in_testing: parse_or(
                lookup,
                "RELFLOW_MIN_DAYS_IN_TESTING",
                defaults.min_days_in_testing,
            )?,
            critpath_min_karma: parse_or(
                lookup,
                "RELFLOW_CRITPATH_MIN_KARMA",
                defaults.critpath_min_karma,
            )?,
            critpath_min_days: parse_or(
                lookup,
                "RELFLOW_CRITPATH_MIN_DAYS",
                defaults.critpath_min_days,
            )?,
            require_passing_tests: parse_or(
                lookup,
                "RELFLOW_REQUIRE_PASSING_TESTS",
                defaults.require_passing_tests,
            )?,
        };

        let policy = ObsoletionPolicy::default();
        let obsoletion = ObsoletionPolicy {
            eligible_statuses: list_or(
                lookup,
                "RELFLOW_OBSOLETE_STATUSES",
                policy.eligible_statuses,
                UpdateStatus::from_str_value,
            )?,
            immune_requests: list_or(
                lookup,
                "RELFLOW_OBSOLETE_IMMUNE_REQUESTS",
                policy.immune_requests,
                UpdateRequest::from_str_value,
            )?,
            skip_locked: parse_or(lookup, "RELFLOW_OBSOLETE_SKIP_LOCKED", policy.skip_locked)?,
        };

        let metrics_prefix = lookup("RELFLOW_METRICS_PREFIX")
            .unwrap_or_else(|| DEFAULT_METRICS_PREFIX.to_string());

        Ok(Self {
            requirements,
            obsoletion,
            metrics_prefix,
        })
    }
}
