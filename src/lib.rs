//! HEC Log Generator Library
//!
//! Synthetic application log generator for exercising log-shipping
//! pipelines, with direct delivery to a Splunk HTTP Event Collector:
//!
//! - **config**: Environment-based configuration
//! - **event**: HEC event record and severities
//! - **source**: Pluggable event sources
//! - **hostname**: Local hostname resolution
//! - **client**: HEC client with request-channel identification
//! - **delivery**: Sequential generate/send/pace loop
//! - **logging**: Local line-oriented log sink
//!
//! # Example
//!
//! ```no_run
//! use hec_loggen::client::HecClient;
//! use hec_loggen::config::Config;
//! use hec_loggen::delivery::{DeliveryLoop, LoopSettings};
//! use hec_loggen::source::RandomEventSource;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let client = HecClient::new(&config).expect("Failed to create client");
//!
//!     let mut delivery = DeliveryLoop::new(
//!         client,
//!         RandomEventSource::new(),
//!         LoopSettings::from_config(&config),
//!     );
//!     delivery.run(CancellationToken::new()).await;
//! }
//! ```

pub mod client;
pub mod config;
pub mod delivery;
pub mod event;
pub mod hostname;
pub mod logging;
pub mod source;

pub use client::{Delivery, DeliveryMode, HecClient, HecError};
pub use config::{Config, ConfigError, SourceMode};
pub use delivery::{DeliveryLoop, DeliveryStats, LoopSettings, TickOutcome};
pub use event::{HecEvent, Severity};
pub use source::{EventSource, GeneratedEvent, RandomEventSource, RequestEventSource, SourceError};
