//! Event sources feeding the delivery loop.
//!
//! A source turns a sequence number into one (message, severity) pair. The
//! sequence is owned by the loop, so sources hold no counters of their own.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::event::Severity;

const INFO_MESSAGES: &[&str] = &[
    "User authentication successful",
    "Processing transaction",
    "Database query executed",
    "API request received",
    "Cache hit for user data",
    "Background job started",
    "Email notification sent",
    "File upload completed",
    "Session created",
    "Configuration reloaded",
];

const ERROR_MESSAGES: &[&str] = &[
    "Connection timeout",
    "Invalid input parameter",
    "Resource not found",
    "Permission denied",
];

const ERROR_PROBABILITY: f64 = 0.1;

/// Drawn only after the error roll misses.
const WARNING_PROBABILITY: f64 = 0.2;

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE"];

const HTTP_ENDPOINTS: &[&str] = &["/api/users", "/api/products", "/api/orders", "/api/auth"];

const HTTP_STATUSES: &[u16] = &[200, 201, 400, 404, 500];

/// One generated log line before it is wrapped into a `HecEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedEvent {
    pub message: String,
    pub severity: Severity,
}

impl GeneratedEvent {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// Errors raised by an event source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("event source failed: {0}")]
    Failed(String),
}

/// Producer of (message, severity) pairs, one per loop tick.
pub trait EventSource: Send {
    /// Produce the event for the given 1-based sequence number.
    fn next_event(&mut self, sequence: u64) -> Result<GeneratedEvent, SourceError>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn next_event(&mut self, sequence: u64) -> Result<GeneratedEvent, SourceError> {
        (**self).next_event(sequence)
    }
}

/// Random application messages: roughly 10% errors, 18% warnings, the rest info.
pub struct RandomEventSource {
    rng: StdRng,
}

impl RandomEventSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn generate(&mut self) -> GeneratedEvent {
        let rng = &mut self.rng;

        if rng.gen_bool(ERROR_PROBABILITY) {
            let what = ERROR_MESSAGES.choose(rng).copied().unwrap_or("Unknown error");
            let user = rng.gen_range(1..=100);
            GeneratedEvent::new(format!("ERROR: {} - User: user{}", what, user), Severity::Error)
        } else if rng.gen_bool(WARNING_PROBABILITY) {
            let usage = rng.gen_range(70..=95);
            GeneratedEvent::new(
                format!("WARNING: High memory usage detected - {}%", usage),
                Severity::Warning,
            )
        } else {
            let what = INFO_MESSAGES.choose(rng).copied().unwrap_or("Heartbeat");
            let request_id = rng.gen_range(1000..=9999);
            GeneratedEvent::new(
                format!("INFO: {} - RequestID: {}", what, request_id),
                Severity::Info,
            )
        }
    }
}

impl Default for RandomEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for RandomEventSource {
    fn next_event(&mut self, _sequence: u64) -> Result<GeneratedEvent, SourceError> {
        Ok(self.generate())
    }
}

/// HTTP access-log lines derived entirely from the sequence number.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestEventSource;

impl RequestEventSource {
    pub fn new() -> Self {
        Self
    }
}

impl EventSource for RequestEventSource {
    fn next_event(&mut self, sequence: u64) -> Result<GeneratedEvent, SourceError> {
        let n = sequence as usize;
        let method = HTTP_METHODS[n % HTTP_METHODS.len()];
        let endpoint = HTTP_ENDPOINTS[n % HTTP_ENDPOINTS.len()];
        let status = HTTP_STATUSES[n % HTTP_STATUSES.len()];
        let response_time = (sequence.wrapping_mul(10) % 500) + 50;

        let message = format!(
            "RequestID: {} | Method: {} | Endpoint: {} | Status: {} | ResponseTime: {}ms",
            sequence, method, endpoint, status, response_time
        );
        let severity = if status >= 400 {
            Severity::Error
        } else {
            Severity::Info
        };

        Ok(GeneratedEvent::new(message, severity))
    }
}
