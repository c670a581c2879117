//! HTTP Event Collector client.
//!
//! One `HecClient` owns one delivery channel to one collector endpoint: a
//! reqwest connection pool, a fixed header set and a channel id generated at
//! construction. Each `send` is exactly one POST carrying one event.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::{is_placeholder_token, Config};
use crate::event::{HecEvent, Severity};
use crate::hostname::resolve_hostname;

/// Header carrying the request channel id. Collectors with indexer
/// acknowledgment enabled reject requests without it.
pub const CHANNEL_HEADER: &str = "x-splunk-request-channel";

/// Scheme prefix of the Authorization header.
const AUTH_SCHEME: &str = "Splunk";

/// Stand-in body when a rejection body cannot be read.
const UNREADABLE_BODY: &str = "<unreadable response body>";

/// Errors that can occur during HEC client operations.
///
/// `Timeout` and `Transport` are routine network failures; the rest indicate
/// a bug or misconfiguration.
#[derive(Debug, Error)]
pub enum HecError {
    #[error("HEC request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("HEC transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Failed to serialize HEC event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("HEC client configuration error: {0}")]
    Config(String),
}

impl HecError {
    /// Whether this is a network-level failure (connect, TLS, timeout).
    pub fn is_transport(&self) -> bool {
        matches!(self, HecError::Timeout(_) | HecError::Transport(_))
    }
}

impl From<reqwest::Error> for HecError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HecError::Timeout(err)
        } else {
            HecError::Transport(err)
        }
    }
}

/// Result of a `send` that reached a decision without a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Collector answered 200
    Accepted {
        /// Acknowledgment id, present when indexer acknowledgment is enabled
        ack_id: Option<u64>,
    },

    /// Collector answered with any other status; the event is dropped
    Rejected { status: StatusCode, body: String },

    /// Client is in local-only mode; no request was made
    Skipped,
}

impl Delivery {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Delivery::Accepted { .. })
    }
}

/// Whether the client talks to the collector at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Remote,

    /// Token missing or placeholder; events are only logged locally
    LocalOnly,
}

/// Success body returned by the collector.
#[derive(Debug, Clone, Deserialize)]
struct HecResponse {
    #[serde(default, rename = "ackId")]
    ack_id: Option<u64>,
}

/// Client for one HEC endpoint.
///
/// # Example
///
/// ```no_run
/// use hec_loggen::client::HecClient;
/// use hec_loggen::config::Config;
/// use hec_loggen::event::Severity;
///
/// #[tokio::main]
/// async fn main() {
///     let config = Config::from_env().expect("Failed to load config");
///     let client = HecClient::new(&config).expect("Failed to create client");
///
///     match client.send("Session created", Severity::Info).await {
///         Ok(delivery) => println!("{:?}", delivery),
///         Err(e) => eprintln!("Failed to send: {}", e),
///     }
/// }
/// ```
pub struct HecClient {
    /// The underlying HTTP client (reused for connection pooling)
    client: Client,

    url: Url,

    index: String,

    sourcetype: String,

    /// Hostname resolved once at construction
    host: String,

    /// Request channel id, fixed for the lifetime of the client
    channel: Uuid,

    timeout: Duration,

    mode: DeliveryMode,
}

impl HecClient {
    /// Create a client from the loaded configuration.
    ///
    /// No network traffic happens here. A placeholder token puts the client
    /// in local-only mode instead of failing.
    ///
    /// # Errors
    ///
    /// Returns `HecError::Config` if the URL does not parse, the token
    /// cannot be carried in a header, or the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, HecError> {
        Self::with_host(config, resolve_hostname())
    }

    /// Create a client that stamps events with the given host instead of
    /// the resolved hostname.
    pub fn with_host(config: &Config, host: impl Into<String>) -> Result<Self, HecError> {
        let url = Url::parse(&config.hec_url)
            .map_err(|e| HecError::Config(format!("invalid HEC URL '{}': {}", config.hec_url, e)))?;

        let channel = Uuid::new_v4();

        let mode = if is_placeholder_token(&config.hec_token) {
            error!("SPLUNK_HEC_TOKEN not set! Events will NOT be sent to Splunk HEC");
            error!("Please set environment variable: -e SPLUNK_HEC_TOKEN=<your-token>");
            warn!("Continuing without Splunk HEC (local logs only)...");
            DeliveryMode::LocalOnly
        } else {
            DeliveryMode::Remote
        };

        let headers = build_headers(&config.hec_token, channel, mode)?;

        if config.insecure_skip_verify {
            warn!(
                url = %url,
                "TLS certificate verification disabled for HEC endpoint"
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| HecError::Config(e.to_string()))?;

        Ok(Self {
            client,
            url,
            index: config.index.clone(),
            sourcetype: config.sourcetype.clone(),
            host: host.into(),
            channel,
            timeout: config.request_timeout,
            mode,
        })
    }

    /// Send one event to the collector.
    ///
    /// A non-200 answer is returned as `Delivery::Rejected`, never as an
    /// error. Neither rejections nor transport failures are retried here.
    ///
    /// # Errors
    ///
    /// `HecError::Timeout` / `HecError::Transport` for network failures,
    /// `HecError::Serialize` if the event cannot be encoded.
    pub async fn send(&self, message: &str, severity: Severity) -> Result<Delivery, HecError> {
        if self.mode == DeliveryMode::LocalOnly {
            debug!("Local-only mode, skipping HEC delivery");
            return Ok(Delivery::Skipped);
        }

        let event = HecEvent::new(
            self.host.as_str(),
            self.index.as_str(),
            self.sourcetype.as_str(),
            message,
            severity,
        );
        self.send_event(&event).await
    }

    /// Send a pre-built event. Local-only mode still applies.
    pub async fn send_event(&self, event: &HecEvent) -> Result<Delivery, HecError> {
        if self.mode == DeliveryMode::LocalOnly {
            return Ok(Delivery::Skipped);
        }

        let body = serde_json::to_vec(event)?;

        debug!(
            url = %self.url,
            channel = %self.channel,
            severity = %event.event.severity,
            bytes = body.len(),
            "Sending HEC event"
        );

        let response = self
            .client
            .post(self.url.clone())
            .timeout(self.timeout)
            .body(body)
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::OK {
            let ack_id = match response.text().await {
                Ok(text) => serde_json::from_str::<HecResponse>(&text)
                    .ok()
                    .and_then(|r| r.ack_id),
                Err(e) => {
                    debug!(error = %e, "Could not read HEC success body");
                    None
                }
            };
            Ok(Delivery::Accepted { ack_id })
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| UNREADABLE_BODY.to_string());
            Ok(Delivery::Rejected { status, body })
        }
    }

    /// Request channel id attached to every request from this client.
    pub fn channel(&self) -> Uuid {
        self.channel
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub fn is_local_only(&self) -> bool {
        self.mode == DeliveryMode::LocalOnly
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn sourcetype(&self) -> &str {
        &self.sourcetype
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Build the fixed header set: auth, content type and request channel.
fn build_headers(token: &str, channel: Uuid, mode: DeliveryMode) -> Result<HeaderMap, HecError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        CHANNEL_HEADER,
        HeaderValue::from_str(&channel.to_string())
            .map_err(|e| HecError::Config(format!("invalid channel id: {}", e)))?,
    );

    // Never sent in local-only mode, so the placeholder is left out.
    if mode == DeliveryMode::Remote {
        let mut auth = HeaderValue::from_str(&format!("{} {}", AUTH_SCHEME, token.trim()))
            .map_err(|_| HecError::Config("HEC token contains invalid header characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
    }

    Ok(headers)
}
