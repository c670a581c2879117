//! Local log sink.
//!
//! Every line, on the console and in the append-only log file, has the form
//!
//! ```text
//! 2024-05-01 12:00:00,250 - MyApp - WARNING - WARNING: High memory usage detected - 81%
//! ```
//!
//! which file-tailing forwarders downstream parse as-is.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use thiserror::Error;
use tracing::{warn, Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{self, DefaultFields, FormatEvent, FormatFields};
use tracing_subscriber::fmt::{FmtContext, Layer as FmtLayer, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Errors raised while setting up local logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Renders `<timestamp> - <logger-name> - <LEVEL> - <message> [fields]`.
#[derive(Debug, Clone)]
pub struct LineFormatter {
    logger_name: String,
}

impl LineFormatter {
    pub fn new(logger_name: impl Into<String>) -> Self {
        Self {
            logger_name: logger_name.into(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} - {} - {} - ",
            Local::now().format(TIMESTAMP_FORMAT),
            self.logger_name,
            level_name(event.metadata().level())
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Level names as file-tailing parsers expect them.
pub fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

/// Open the log file for appending, creating its directory first.
pub fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::OpenFile {
            path: path.to_path_buf(),
            source,
        })
}

/// A fmt layer rendering plain lines (no ANSI styling) to `writer`.
pub fn line_layer<S, W>(logger_name: &str, writer: W) -> FmtLayer<S, DefaultFields, LineFormatter, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt::layer()
        .event_format(LineFormatter::new(logger_name))
        .with_ansi(false)
        .with_writer(writer)
}

/// Install the global subscriber: console plus, when possible, the log file.
///
/// A log file that cannot be opened is reported as a warning and logging
/// continues on the console only. `RUST_LOG` overrides the default `info`
/// filter.
pub fn init(logger_name: &str, log_file: &Path) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file, file_error) = match open_log_file(log_file) {
        Ok(file) => (Some(file), None),
        Err(e) => (None, Some(e)),
    };

    let console_layer = line_layer(logger_name, io::stdout);
    let file_layer = file.map(|file| line_layer(logger_name, Mutex::new(file)));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    if let Some(e) = file_error {
        warn!(error = %e, "Continuing with console logging only");
    }

    Ok(())
}
