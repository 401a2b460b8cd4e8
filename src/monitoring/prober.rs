use std::time::{Duration, Instant};

use anyhow::Result;
use thiserror::Error;

use super::types::ProbeOutcome;

/// Error detail recorded when a probe exceeds the client timeout. Kept as a
/// literal marker so it can be told apart from other network failures.
pub const TIMEOUT_MARKER: &str = "Timeout";

/// Failure modes of a single probe. These never escape the prober; they are
/// folded into a `Down` classification with the error detail populated.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{}", TIMEOUT_MARKER)]
    Timeout,
    #[error("{0}")]
    Network(String),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
}

/// Prober trait so the sweep pipeline can be driven with scripted outcomes in
/// tests.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Perform one probe against the target and classify the result.
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// HTTP prober: a single GET with a bounded timeout, following redirects up
/// to a fixed hop limit. No retries.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration, max_redirects: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .build()?;

        Ok(Self { client })
    }

    async fn dispatch(&self, target: &str) -> Result<(u64, reqwest::StatusCode), ProbeError> {
        let start = Instant::now();

        let response = self.client.get(target).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;

        Ok((start.elapsed().as_millis() as u64, response.status()))
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let target = normalize_url(url);

        match self.dispatch(&target).await {
            // Redirects were already followed by the client; the final
            // response's ok flag decides the classification.
            Ok((latency_ms, status)) if status.is_success() => ProbeOutcome::up(latency_ms),
            Ok((latency_ms, status)) => ProbeOutcome::down(
                Some(latency_ms),
                ProbeError::HttpStatus(status.as_u16()).to_string(),
            ),
            Err(e) => ProbeOutcome::down(None, e.to_string()),
        }
    }
}

/// Default to a secure scheme when the stored target omits one.
pub fn normalize_url(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::MonitorStatus;

    #[test]
    fn test_normalize_url_prepends_https() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("example.com/health"), "https://example.com/health");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
    }

    #[tokio::test]
    async fn test_connection_refused_is_down_with_network_detail() {
        let prober = HttpProber::new(Duration::from_secs(5), 5).unwrap();

        // Nothing listens on the discard port locally.
        let outcome = prober.probe("http://127.0.0.1:9").await;

        assert_eq!(outcome.status, MonitorStatus::Down);
        assert_eq!(outcome.latency_ms, None);
        let detail = outcome.error_detail.expect("network failure carries a detail");
        assert_ne!(detail, TIMEOUT_MARKER);
    }

    #[tokio::test]
    async fn test_stalled_server_yields_timeout_marker() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept connections but never answer, so the client timeout fires.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                let (socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                held.push(socket);
            }
        });

        let prober = HttpProber::new(Duration::from_millis(500), 5).unwrap();
        let outcome = prober.probe(&format!("http://{addr}")).await;

        assert_eq!(outcome.status, MonitorStatus::Down);
        assert_eq!(outcome.error_detail.as_deref(), Some(TIMEOUT_MARKER));

        server.abort();
    }

    #[tokio::test]
    async fn test_non_ok_response_is_down_with_status_detail() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\n\r\n")
                    .await;
            }
        });

        let prober = HttpProber::new(Duration::from_secs(5), 5).unwrap();
        let outcome = prober.probe(&format!("http://{addr}")).await;

        assert_eq!(outcome.status, MonitorStatus::Down);
        assert!(outcome.latency_ms.is_some());
        assert_eq!(outcome.error_detail.as_deref(), Some("HTTP status 503"));

        let _ = server.await;
    }
}
