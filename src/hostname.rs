//! Hostname detection

use std::env;
use tracing::warn;

/// Resolve the hostname stamped on every event.
///
/// `HOSTNAME` wins when set and non-empty, then the system hostname, then
/// `"unknown"`. Callers resolve once and cache the result.
#[must_use]
pub fn resolve_hostname() -> String {
    if let Ok(hostname) = env::var("HOSTNAME") {
        if !hostname.trim().is_empty() {
            return hostname.trim().to_string();
        }
    }

    if let Some(hostname) = system_hostname() {
        return hostname;
    }

    warn!("Could not determine hostname, using 'unknown'");
    "unknown".to_string()
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => name
            .to_str()
            .map(str::to_string)
            .filter(|name| !name.is_empty()),
        Err(e) => {
            warn!("Failed to get system hostname: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    env::var("COMPUTERNAME").ok().filter(|name| !name.is_empty())
}
