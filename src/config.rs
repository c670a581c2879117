//! Configuration module for the HEC log generator.
//!
//! All settings are read once from the environment at startup and stay
//! immutable for the lifetime of the process.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

/// Token value shipped in sample deployments. Seeing it means nobody
/// configured a real credential.
pub const PLACEHOLDER_TOKEN: &str = "YOUR_HEC_TOKEN_HERE";

/// Default collector endpoint
const DEFAULT_HEC_URL: &str = "https://localhost:8088/services/collector";

const DEFAULT_INDEX: &str = "main";

const DEFAULT_SOURCETYPE: &str = "python:app";

/// Default pacing between generated events, in seconds
const DEFAULT_INTERVAL_SECS: u64 = 30;

/// Upper bound on the pacing interval (one event a day)
const MAX_INTERVAL_SECS: u64 = 86_400;

/// Default HEC request timeout, in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Pause applied after a tick fails for a reason other than transport or
/// server rejection.
pub const UNEXPECTED_COOLDOWN_SECS: u64 = 5;

const DEFAULT_LOG_FILE: &str = "/var/log/myapp/application.log";

const DEFAULT_LOGGER_NAME: &str = "MyApp";

/// Which built-in event source feeds the delivery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    /// Random application messages with weighted severities
    #[default]
    Random,

    /// Deterministic HTTP access-log style lines keyed by sequence number
    Requests,
}

impl std::str::FromStr for SourceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(SourceMode::Random),
            "requests" => Ok(SourceMode::Requests),
            other => Err(format!("'{}' is not one of: random, requests", other)),
        }
    }
}

/// Configuration for the generator and its HEC client.
///
/// Settings are sourced from environment variables:
/// - `SPLUNK_HEC_URL`: collector endpoint (default: https://localhost:8088/services/collector)
/// - `SPLUNK_HEC_TOKEN`: HEC token (default: placeholder, which disables delivery)
/// - `SPLUNK_INDEX`: target index (default: main)
/// - `SPLUNK_SOURCETYPE`: sourcetype label (default: python:app)
/// - `LOG_INTERVAL_SECONDS`: seconds between events (default: 30)
/// - `SPLUNK_HEC_TIMEOUT_SECS`: request timeout (default: 10)
/// - `SPLUNK_HEC_INSECURE`: accept invalid TLS certificates (default: false)
/// - `LOG_FILE`: local log file (default: /var/log/myapp/application.log)
/// - `LOG_LOGGER_NAME`: logger name in local log lines (default: MyApp)
/// - `LOG_SOURCE`: `random` or `requests` (default: random)
/// - `LOG_MAX_EVENTS`: stop after this many events (default: run forever)
#[derive(Debug, Clone)]
pub struct Config {
    /// Full URL of the HEC event endpoint
    pub hec_url: String,

    /// HEC authentication token
    pub hec_token: String,

    /// Index attached to every event
    pub index: String,

    /// Sourcetype attached to every event
    pub sourcetype: String,

    /// Pacing between ticks of the delivery loop
    pub interval: Duration,

    /// Bound on a single HEC request
    pub request_timeout: Duration,

    /// Accept certificates that fail verification (self-signed collectors)
    pub insecure_skip_verify: bool,

    /// Pause after an unexpected tick failure
    pub unexpected_cooldown: Duration,

    /// Append-only local log file
    pub log_file: PathBuf,

    /// Logger name rendered in local log lines
    pub logger_name: String,

    /// Built-in event source
    pub source_mode: SourceMode,

    /// Stop after this many events; `None` runs until cancelled
    pub max_events: Option<u64>,
}

/// Error type for configuration loading failures
#[derive(Debug, Error)]
#[error("Configuration error for {env_var}: {message}")]
pub struct ConfigError {
    pub message: String,
    pub env_var: String,
}

impl ConfigError {
    fn new(env_var: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            env_var: env_var.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hec_loggen::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("HEC URL: {}", config.hec_url);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset variables fall back to defaults; set but malformed ones are
    /// reported as `ConfigError`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hec_url = lookup("SPLUNK_HEC_URL").unwrap_or_else(|| DEFAULT_HEC_URL.to_string());
        validate_url("SPLUNK_HEC_URL", &hec_url)?;

        let hec_token = lookup("SPLUNK_HEC_TOKEN")
            .map(|t| t.trim().to_string())
            .unwrap_or_else(|| PLACEHOLDER_TOKEN.to_string());

        let index = non_empty(&lookup, "SPLUNK_INDEX", DEFAULT_INDEX)?;
        let sourcetype = non_empty(&lookup, "SPLUNK_SOURCETYPE", DEFAULT_SOURCETYPE)?;
        let logger_name = non_empty(&lookup, "LOG_LOGGER_NAME", DEFAULT_LOGGER_NAME)?;

        let interval_secs = parse_bounded(
            &lookup,
            "LOG_INTERVAL_SECONDS",
            DEFAULT_INTERVAL_SECS,
            1,
            MAX_INTERVAL_SECS,
        )?;
        let timeout_secs = parse_bounded(
            &lookup,
            "SPLUNK_HEC_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
            1,
            MAX_REQUEST_TIMEOUT_SECS,
        )?;

        let insecure_skip_verify = match lookup("SPLUNK_HEC_INSECURE") {
            Some(value) => parse_bool("SPLUNK_HEC_INSECURE", &value)?,
            None => false,
        };

        let source_mode = match lookup("LOG_SOURCE") {
            Some(value) => value
                .parse::<SourceMode>()
                .map_err(|e| ConfigError::new("LOG_SOURCE", e))?,
            None => SourceMode::default(),
        };

        let max_events = match lookup("LOG_MAX_EVENTS") {
            Some(value) => {
                let n: u64 = value.trim().parse().map_err(|_| {
                    ConfigError::new("LOG_MAX_EVENTS", format!("'{}' is not a valid number", value))
                })?;
                if n == 0 {
                    return Err(ConfigError::new(
                        "LOG_MAX_EVENTS",
                        "max events must be greater than 0",
                    ));
                }
                Some(n)
            }
            None => None,
        };

        let log_file = lookup("LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

        Ok(Self {
            hec_url,
            hec_token,
            index,
            sourcetype,
            interval: Duration::from_secs(interval_secs),
            request_timeout: Duration::from_secs(timeout_secs),
            insecure_skip_verify,
            unexpected_cooldown: Duration::from_secs(UNEXPECTED_COOLDOWN_SECS),
            log_file,
            logger_name,
            source_mode,
            max_events,
        })
    }

    /// Whether the configured token is missing or still the sample placeholder.
    pub fn has_placeholder_token(&self) -> bool {
        is_placeholder_token(&self.hec_token)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hec_url: DEFAULT_HEC_URL.to_string(),
            hec_token: PLACEHOLDER_TOKEN.to_string(),
            index: DEFAULT_INDEX.to_string(),
            sourcetype: DEFAULT_SOURCETYPE.to_string(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            insecure_skip_verify: false,
            unexpected_cooldown: Duration::from_secs(UNEXPECTED_COOLDOWN_SECS),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            logger_name: DEFAULT_LOGGER_NAME.to_string(),
            source_mode: SourceMode::default(),
            max_events: None,
        }
    }
}

/// Returns true for an empty token or the sample placeholder.
pub fn is_placeholder_token(token: &str) -> bool {
    let token = token.trim();
    token.is_empty() || token == PLACEHOLDER_TOKEN
}

fn validate_url(env_var: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::new(env_var, format!("'{}' is not a valid URL: {}", value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::new(
            env_var,
            format!("unsupported scheme '{}', expected http or https", other),
        )),
    }
}

fn non_empty<F>(lookup: &F, env_var: &str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(env_var) {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::new(env_var, "value must not be empty"))
        }
        Some(value) => Ok(value.trim().to_string()),
        None => Ok(default.to_string()),
    }
}

fn parse_bounded<F>(
    lookup: &F,
    env_var: &str,
    default: u64,
    min: u64,
    max: u64,
) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(env_var) else {
        return Ok(default);
    };

    let parsed: u64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::new(env_var, format!("'{}' is not a valid number", value)))?;

    if parsed < min {
        return Err(ConfigError::new(
            env_var,
            format!("{} is below minimum ({})", parsed, min),
        ));
    }
    if parsed > max {
        return Err(ConfigError::new(
            env_var,
            format!("{} exceeds maximum ({})", parsed, max),
        ));
    }

    Ok(parsed)
}

fn parse_bool(env_var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::new(
            env_var,
            format!("'{}' is not a boolean", value),
        )),
    }
}
