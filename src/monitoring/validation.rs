//! Monitor target validation applied at the store boundary.

use anyhow::{Result, anyhow};
use url::Url;

use super::prober::normalize_url;

/// Validate a monitor target URL.
///
/// The stored form may omit the scheme (the prober defaults to https), so
/// validation runs on the normalized form.
pub fn validate_monitor_url(target: &str) -> Result<()> {
    if target.trim().is_empty() {
        return Err(anyhow!("Monitor URL must not be empty"));
    }

    let normalized = normalize_url(target);
    let url = Url::parse(&normalized).map_err(|e| anyhow!("Invalid URL: {}", e))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("Unsupported scheme for monitor: {}", other)),
    }

    if url.host_str().is_none() {
        return Err(anyhow!("Monitor URL is missing a host"));
    }

    if let Some(port) = url.port() {
        if port == 0 {
            return Err(anyhow!("Port 0 is not valid"));
        }
    }

    Ok(())
}
