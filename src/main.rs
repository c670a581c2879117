//! HEC Log Generator - synthetic application logs for log-shipping pipelines
//!
//! Emits one semi-realistic log line per interval to a local file (for
//! file-tailing forwarders and OTEL collectors) and, when a token is
//! configured, POSTs the same event to a Splunk HTTP Event Collector.
//!
//! ## Configuration
//!
//! - `SPLUNK_HEC_URL`: collector endpoint
//! - `SPLUNK_HEC_TOKEN`: HEC token (unset: local logs only)
//! - `SPLUNK_INDEX`: target index (default: main)
//! - `SPLUNK_SOURCETYPE`: sourcetype (default: python:app)
//! - `LOG_INTERVAL_SECONDS`: seconds between events (default: 30)
//! - `SPLUNK_HEC_TIMEOUT_SECS`: request timeout (default: 10)
//! - `SPLUNK_HEC_INSECURE`: accept self-signed certificates (default: false)
//! - `LOG_FILE`: local log file (default: /var/log/myapp/application.log)
//! - `LOG_LOGGER_NAME`: logger name in log lines (default: MyApp)
//! - `LOG_SOURCE`: `random` or `requests` (default: random)
//! - `LOG_MAX_EVENTS`: stop after N events (default: unlimited)
//! - `RUST_LOG`: logging level filter (default: info)

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use hec_loggen::client::HecClient;
use hec_loggen::config::{Config, SourceMode};
use hec_loggen::delivery::{estimate_daily_volume, DeliveryLoop, LoopSettings};
use hec_loggen::logging;
use hec_loggen::source::{EventSource, RandomEventSource, RequestEventSource};

const BANNER_WIDTH: usize = 50;

#[tokio::main]
async fn main() {
    // Logging needs the file location, so configuration is read first and
    // its errors are reported once the subscriber is up.
    let config = Config::from_env();

    let (logger_name, log_file) = match &config {
        Ok(c) => (c.logger_name.clone(), c.log_file.clone()),
        Err(_) => {
            let defaults = Config::default();
            (defaults.logger_name, defaults.log_file)
        }
    };

    if let Err(e) = logging::init(&logger_name, &log_file) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let mode_line = if config.has_placeholder_token() {
        "Application started - Local Logging Mode"
    } else {
        "Application started - Splunk HEC Mode"
    };
    info!("{}", "=".repeat(BANNER_WIDTH));
    info!("{}", mode_line);
    info!("Timestamp: {}", Local::now().to_rfc3339());
    info!("{}", "=".repeat(BANNER_WIDTH));

    let client = match HecClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create HEC client");
            std::process::exit(1);
        }
    };

    let (daily_events, daily_mb) = estimate_daily_volume(config.interval);
    info!("Writing logs to: {}", config.log_file.display());
    info!("Log generation interval: {} seconds", config.interval.as_secs());
    info!("Estimated daily logs: ~{}", daily_events);
    info!("Estimated daily volume: ~{:.2} MB", daily_mb);
    info!("Sending to Splunk HEC: {}", client.url());
    info!("Index: {}, Sourcetype: {}", client.index(), client.sourcetype());
    info!("Channel ID: {}", client.channel());
    info!("Using channel-based delivery for Splunk Cloud");

    let source: Box<dyn EventSource> = match config.source_mode {
        SourceMode::Random => Box::new(RandomEventSource::new()),
        SourceMode::Requests => Box::new(RequestEventSource::new()),
    };

    let mut delivery = DeliveryLoop::new(client, source, LoopSettings::from_config(&config));
    delivery.probe().await;

    let cancel = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(cancel.clone()));

    delivery.run(cancel).await;

    info!("Log generator stopped");
}

/// Cancel the token on Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            error!(error = %e, "Failed to listen for shutdown signal");
                        }
                    }
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for shutdown signal");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
    }

    info!("Shutdown signal received, stopping...");
    cancel.cancel();
}
