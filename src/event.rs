//! HEC event record and severity levels.
//!
//! `HecEvent` is the exact JSON document POSTed to the collector, one event
//! per request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value of the `source` field on every event.
pub const EVENT_SOURCE: &str = "myapp";

/// Value of `event.application` on every event.
pub const APPLICATION_NAME: &str = "MyApp";

/// Severity of a generated event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Get all severities.
    pub fn all() -> &'static [Severity] {
        &[Severity::Info, Severity::Warning, Severity::Error]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload nested under `event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBody {
    pub message: String,
    pub severity: Severity,
    pub application: String,
}

/// A single HEC event.
///
/// Built per send call and dropped once the request resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HecEvent {
    /// Unix epoch seconds with sub-second precision
    pub time: f64,

    /// Host that produced the event
    pub host: String,

    pub source: String,

    pub sourcetype: String,

    pub index: String,

    pub event: EventBody,
}

impl HecEvent {
    /// Create an event stamped with the current wall-clock time.
    pub fn new(
        host: impl Into<String>,
        index: impl Into<String>,
        sourcetype: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self::at(Utc::now(), host, index, sourcetype, message, severity)
    }

    /// Create an event stamped with the given time.
    pub fn at(
        timestamp: DateTime<Utc>,
        host: impl Into<String>,
        index: impl Into<String>,
        sourcetype: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            time: epoch_seconds(timestamp),
            host: host.into(),
            source: EVENT_SOURCE.to_string(),
            sourcetype: sourcetype.into(),
            index: index.into(),
            event: EventBody {
                message: message.into(),
                severity,
                application: APPLICATION_NAME.to_string(),
            },
        }
    }
}

/// Unix epoch seconds at microsecond resolution.
pub fn epoch_seconds(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_micros() as f64 / 1_000_000.0
}
