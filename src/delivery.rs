//! Delivery loop: generate, send, pace.
//!
//! Strictly sequential. Each tick draws one event from the source, records
//! it in the local log, sends it through the `HecClient` and fully resolves
//! the outcome before the next tick starts. Cancellation is observed between
//! ticks and interrupts the pacing sleep, never an in-flight send.

use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{Delivery, HecClient, HecError};
use crate::config::{Config, UNEXPECTED_COOLDOWN_SECS};
use crate::event::Severity;
use crate::source::{EventSource, GeneratedEvent};

/// Message sent once at startup to check the collector answers.
pub const PROBE_MESSAGE: &str = "Application started - HEC test";

/// Rough size of one event on the wire, used for volume estimates.
const ESTIMATED_EVENT_BYTES: f64 = 150.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Pacing settings for the loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Sleep between ticks
    pub interval: Duration,

    /// Sleep after a tick that failed unexpectedly
    pub unexpected_cooldown: Duration,

    /// Stop after this many ticks
    pub max_events: Option<u64>,
}

impl LoopSettings {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            unexpected_cooldown: Duration::from_secs(UNEXPECTED_COOLDOWN_SECS),
            max_events: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.interval,
            unexpected_cooldown: config.unexpected_cooldown,
            max_events: config.max_events,
        }
    }
}

/// What happened on one tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// Collector accepted the event
    Delivered { sequence: u64, ack_id: Option<u64> },

    /// Collector answered non-200; event dropped
    Rejected {
        sequence: u64,
        status: StatusCode,
        body: String,
    },

    /// Network-level failure; event dropped
    TransportFailure { sequence: u64, error: HecError },

    /// Client in local-only mode; event only logged locally
    LocalOnly { sequence: u64 },

    /// Anything else, e.g. a failing source or an unencodable event
    Unexpected { sequence: u64, reason: String },
}

impl TickOutcome {
    pub fn sequence(&self) -> u64 {
        match self {
            TickOutcome::Delivered { sequence, .. }
            | TickOutcome::Rejected { sequence, .. }
            | TickOutcome::TransportFailure { sequence, .. }
            | TickOutcome::LocalOnly { sequence }
            | TickOutcome::Unexpected { sequence, .. } => *sequence,
        }
    }

    pub fn is_unexpected(&self) -> bool {
        matches!(self, TickOutcome::Unexpected { .. })
    }
}

/// Counters kept by the loop across ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub ticks: u64,
    pub delivered: u64,
    pub rejected: u64,
    pub transport_failures: u64,
    pub skipped: u64,
    pub unexpected: u64,
}

impl DeliveryStats {
    fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Delivered { .. } => self.delivered += 1,
            TickOutcome::Rejected { .. } => self.rejected += 1,
            TickOutcome::TransportFailure { .. } => self.transport_failures += 1,
            TickOutcome::LocalOnly { .. } => self.skipped += 1,
            TickOutcome::Unexpected { .. } => self.unexpected += 1,
        }
    }
}

/// Drives an `EventSource` into a `HecClient` at a fixed cadence.
pub struct DeliveryLoop<S> {
    client: HecClient,
    source: S,
    settings: LoopSettings,

    /// Last sequence number handed to the source
    sequence: u64,

    stats: DeliveryStats,
}

impl<S: EventSource> DeliveryLoop<S> {
    pub fn new(client: HecClient, source: S, settings: LoopSettings) -> Self {
        Self {
            client,
            source,
            settings,
            sequence: 0,
            stats: DeliveryStats::default(),
        }
    }

    /// Send a single test event and report whether the collector accepted it.
    ///
    /// Returns `None` in local-only mode, where nothing is sent.
    pub async fn probe(&self) -> Option<bool> {
        if self.client.is_local_only() {
            return None;
        }

        info!("Testing Splunk HEC connection...");
        match self.client.send(PROBE_MESSAGE, Severity::Info).await {
            Ok(Delivery::Accepted { .. }) => {
                info!("Successfully connected to Splunk HEC!");
                Some(true)
            }
            Ok(Delivery::Rejected { status, body }) => {
                warn!("HEC returned status {}: {}", status.as_u16(), body);
                error!("Failed to connect to Splunk HEC. Check token and URL.");
                Some(false)
            }
            Ok(Delivery::Skipped) => None,
            Err(e) => {
                error!("Failed to send to Splunk HEC: {}", e);
                error!("Failed to connect to Splunk HEC. Check token and URL.");
                Some(false)
            }
        }
    }

    /// Run one generate → record → send cycle.
    pub async fn tick(&mut self) -> TickOutcome {
        self.sequence += 1;
        let sequence = self.sequence;

        let outcome = match self.source.next_event(sequence) {
            Ok(generated) => {
                record_locally(&generated);
                match self
                    .client
                    .send(&generated.message, generated.severity)
                    .await
                {
                    Ok(Delivery::Accepted { ack_id }) => TickOutcome::Delivered { sequence, ack_id },
                    Ok(Delivery::Rejected { status, body }) => TickOutcome::Rejected {
                        sequence,
                        status,
                        body,
                    },
                    Ok(Delivery::Skipped) => TickOutcome::LocalOnly { sequence },
                    Err(error) if error.is_transport() => {
                        TickOutcome::TransportFailure { sequence, error }
                    }
                    Err(error) => TickOutcome::Unexpected {
                        sequence,
                        reason: error.to_string(),
                    },
                }
            }
            Err(e) => TickOutcome::Unexpected {
                sequence,
                reason: e.to_string(),
            },
        };

        self.stats.record(&outcome);
        log_outcome(&outcome);
        outcome
    }

    /// Tick until cancelled or `max_events` is reached.
    ///
    /// Returns the final statistics.
    pub async fn run(&mut self, cancel: CancellationToken) -> DeliveryStats {
        info!(
            interval_secs = self.settings.interval.as_secs_f64(),
            channel = %self.client.channel(),
            "Delivery loop started"
        );

        while !cancel.is_cancelled() {
            let outcome = self.tick().await;

            if let Some(max) = self.settings.max_events {
                if self.sequence >= max {
                    info!(max_events = max, "Reached configured event limit");
                    break;
                }
            }

            let pause = if outcome.is_unexpected() {
                self.settings.unexpected_cooldown
            } else {
                self.settings.interval
            };

            tokio::select! {
                _ = sleep(pause) => {}
                _ = cancel.cancelled() => break,
            }
        }

        let stats = self.stats.clone();
        info!(
            ticks = stats.ticks,
            delivered = stats.delivered,
            rejected = stats.rejected,
            transport_failures = stats.transport_failures,
            skipped = stats.skipped,
            unexpected = stats.unexpected,
            "Application shutting down..."
        );
        stats
    }

    pub fn stats(&self) -> &DeliveryStats {
        &self.stats
    }

    pub fn client(&self) -> &HecClient {
        &self.client
    }

    /// Last sequence number used; 0 before the first tick.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Estimated (events per day, MB per day) at the given interval.
pub fn estimate_daily_volume(interval: Duration) -> (u64, f64) {
    let secs = interval.as_secs_f64();
    if secs <= 0.0 {
        return (0, 0.0);
    }
    let events = (SECONDS_PER_DAY / secs).floor() as u64;
    let megabytes = events as f64 * ESTIMATED_EVENT_BYTES / 1024.0 / 1024.0;
    (events, megabytes)
}

/// Write the generated event to the local log at its own severity.
fn record_locally(generated: &GeneratedEvent) {
    match generated.severity {
        Severity::Info => info!("{}", generated.message),
        Severity::Warning => warn!("{}", generated.message),
        Severity::Error => error!("{}", generated.message),
    }
}

fn log_outcome(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::Delivered { sequence, ack_id } => {
            debug!(sequence, ack_id = ?ack_id, "Event delivered to HEC");
        }
        TickOutcome::Rejected {
            sequence,
            status,
            body,
        } => {
            warn!(sequence, "HEC returned status {}: {}", status.as_u16(), body);
        }
        TickOutcome::TransportFailure { sequence, error } => {
            error!(sequence, "Failed to send to Splunk HEC: {}", error);
        }
        TickOutcome::LocalOnly { sequence } => {
            debug!(sequence, "HEC delivery skipped (local-only mode)");
        }
        TickOutcome::Unexpected { sequence, reason } => {
            error!(sequence, "Unexpected error: {}", reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{RequestEventSource, SourceError};
    use mockito::Server;
    use std::time::Instant;
    use tokio::time::timeout;
    use tracing_test::traced_test;

    const PATH: &str = "/services/collector/event";

    /// Source that fails every call.
    struct BrokenSource;

    impl EventSource for BrokenSource {
        fn next_event(&mut self, _sequence: u64) -> Result<GeneratedEvent, SourceError> {
            Err(SourceError::Failed("generator unavailable".to_string()))
        }
    }

    fn client_for(url: &str) -> HecClient {
        let config = Config {
            hec_url: url.to_string(),
            hec_token: "test-token".to_string(),
            request_timeout: Duration::from_secs(2),
            ..Config::default()
        };
        HecClient::with_host(&config, "test-host").unwrap()
    }

    fn fast_settings() -> LoopSettings {
        LoopSettings {
            interval: Duration::from_millis(20),
            unexpected_cooldown: Duration::from_millis(20),
            max_events: None,
        }
    }

    fn refused_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}{}", addr, PATH)
    }

    #[test]
    fn test_estimate_daily_volume() {
        let (events, mb) = estimate_daily_volume(Duration::from_secs(30));
        assert_eq!(events, 2_880);
        assert!((mb - 0.412).abs() < 0.001);

        assert_eq!(estimate_daily_volume(Duration::ZERO), (0, 0.0));
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config {
            interval: Duration::from_secs(7),
            max_events: Some(4),
            ..Config::default()
        };
        let settings = LoopSettings::from_config(&config);
        assert_eq!(settings.interval, Duration::from_secs(7));
        assert_eq!(settings.unexpected_cooldown, Duration::from_secs(5));
        assert_eq!(settings.max_events, Some(4));

        let plain = LoopSettings::new(Duration::from_secs(7));
        assert_eq!(plain.unexpected_cooldown, settings.unexpected_cooldown);
        assert_eq!(plain.max_events, None);
    }

    #[tokio::test]
    async fn test_tick_delivered() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(r#"{"text":"Success","code":0,"ackId":3}"#)
            .create_async()
            .await;

        let client = client_for(&format!("{}{}", server.url(), PATH));
        let mut delivery = DeliveryLoop::new(client, RequestEventSource::new(), fast_settings());

        let outcome = delivery.tick().await;
        assert!(matches!(
            outcome,
            TickOutcome::Delivered { sequence: 1, ack_id: Some(3) }
        ));
        assert_eq!(delivery.stats().delivered, 1);
        assert_eq!(delivery.sequence(), 1);
        assert_eq!(delivery.tick().await.sequence(), 2);
    }

    #[tokio::test]
    async fn test_tick_on_silent_collector_is_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = Config {
            hec_url: format!("http://{}{}", addr, PATH),
            hec_token: "test-token".to_string(),
            request_timeout: Duration::from_secs(1),
            ..Config::default()
        };
        let client = HecClient::with_host(&config, "test-host").unwrap();
        let mut delivery = DeliveryLoop::new(client, RequestEventSource::new(), fast_settings());
        assert_eq!(delivery.client().timeout(), Duration::from_secs(1));

        let outcome = timeout(Duration::from_secs(5), delivery.tick())
            .await
            .expect("request timeout should bound the tick");
        match outcome {
            TickOutcome::TransportFailure { sequence, error } => {
                assert_eq!(sequence, 1);
                assert!(matches!(error, HecError::Timeout(_)));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(delivery.stats().transport_failures, 1);
        assert_eq!(delivery.stats().unexpected, 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_tick_rejected_is_logged_with_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_status(503)
            .with_body("busy")
            .create_async()
            .await;

        let client = client_for(&format!("{}{}", server.url(), PATH));
        let mut delivery = DeliveryLoop::new(client, RequestEventSource::new(), fast_settings());

        match delivery.tick().await {
            TickOutcome::Rejected { status, body, .. } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "busy");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(logs_contain("HEC returned status 503: busy"));
        assert!(logs_contain("RequestID: 1 | Method: POST"));
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_stop_the_loop() {
        let client = client_for(&refused_url());
        let settings = LoopSettings {
            max_events: Some(3),
            ..fast_settings()
        };
        let mut delivery = DeliveryLoop::new(client, RequestEventSource::new(), settings);

        let stats = timeout(Duration::from_secs(10), delivery.run(CancellationToken::new()))
            .await
            .expect("loop should finish");

        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.transport_failures, 3);
        assert_eq!(stats.unexpected, 0);
    }

    #[tokio::test]
    async fn test_local_only_makes_no_requests() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let config = Config {
            hec_url: format!("{}{}", server.url(), PATH),
            ..Config::default()
        };
        let client = HecClient::with_host(&config, "h").unwrap();
        let mut delivery = DeliveryLoop::new(client, RequestEventSource::new(), fast_settings());

        assert_eq!(delivery.probe().await, None);
        assert!(matches!(
            delivery.tick().await,
            TickOutcome::LocalOnly { sequence: 1 }
        ));
        assert_eq!(delivery.stats().skipped, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unexpected_error_uses_cooldown() {
        let client = client_for("http://127.0.0.1:9/unused");
        let settings = LoopSettings {
            interval: Duration::from_secs(60),
            unexpected_cooldown: Duration::from_millis(20),
            max_events: Some(3),
        };
        let mut delivery = DeliveryLoop::new(client, BrokenSource, settings);

        let started = Instant::now();
        let stats = timeout(Duration::from_secs(5), delivery.run(CancellationToken::new()))
            .await
            .expect("cooldown, not the interval, should pace failed ticks");

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(stats.unexpected, 3);
        assert_eq!(stats.ticks, 3);
        assert!(logs_contain("Unexpected error: event source failed: generator unavailable"));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_status(200)
            .create_async()
            .await;

        let client = client_for(&format!("{}{}", server.url(), PATH));
        let settings = LoopSettings::new(Duration::from_secs(3_600));
        let mut delivery = DeliveryLoop::new(client, RequestEventSource::new(), settings);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let stats = timeout(Duration::from_secs(5), delivery.run(cancel))
            .await
            .expect("cancellation should end the sleep");
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.delivered, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_sends_nothing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&format!("{}{}", server.url(), PATH));
        let mut delivery = DeliveryLoop::new(client, RequestEventSource::new(), fast_settings());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let stats = delivery.run(cancel).await;

        assert_eq!(stats, DeliveryStats::default());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_probe_reports_collector_answer() {
        let mut server = Server::new_async().await;
        let ok = server
            .mock("POST", PATH)
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&format!("{}{}", server.url(), PATH));
        let delivery = DeliveryLoop::new(client, RequestEventSource::new(), fast_settings());

        assert_eq!(delivery.probe().await, Some(true));
        ok.assert_async().await;
        ok.remove_async().await;

        let _denied = server
            .mock("POST", PATH)
            .with_status(403)
            .with_body(r#"{"text":"Invalid token","code":4}"#)
            .create_async()
            .await;
        assert_eq!(delivery.probe().await, Some(false));

        // The probe is not a tick.
        assert_eq!(delivery.sequence(), 0);
        assert_eq!(delivery.stats().ticks, 0);
    }
}
