//! HTTP fetcher for the Spring metrics endpoint.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::config::TargetConfig;
use crate::error::{Result, ScrapeError};

/// A response received from the endpoint, whatever its status.
#[derive(Debug)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Full response body.
    pub body: Vec<u8>,
    /// Time from sending the request until the response headers arrived.
    pub elapsed: Duration,
}

/// A failed fetch.
#[derive(Debug)]
pub struct FetchFailure {
    pub error: ScrapeError,
    /// Round-trip time, `None` when the request was never sent.
    pub elapsed: Option<Duration>,
}

/// Issues one authenticated GET per call against the configured URI.
pub struct Fetcher {
    client: reqwest::Client,
    uri: String,
    basic_auth_user: String,
    basic_auth_password: String,
}

impl Fetcher {
    /// Build a fetcher for the given target.
    pub fn new(target: &TargetConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(target.insecure)
            .timeout(target.timeout())
            .build()
            .map_err(|e| ScrapeError::Client(e.to_string()))?;

        Ok(Self {
            client,
            uri: target.uri.clone(),
            basic_auth_user: target.basic_auth_user.clone(),
            basic_auth_password: target.basic_auth_password.clone(),
        })
    }

    /// Target URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Perform a single GET and read the whole body.
    ///
    /// Basic auth is attached even when both credentials are empty.
    pub async fn fetch(&self) -> std::result::Result<FetchResponse, FetchFailure> {
        let request = self
            .client
            .get(&self.uri)
            .basic_auth(&self.basic_auth_user, Some(&self.basic_auth_password))
            .build()
            .map_err(|e| FetchFailure {
                error: ScrapeError::Construction(e.to_string()),
                elapsed: None,
            })?;

        let start = Instant::now();
        let result = self.client.execute(request).await;
        let elapsed = start.elapsed();

        let response = result.map_err(|e| FetchFailure {
            error: ScrapeError::Transport(e.to_string()),
            elapsed: Some(elapsed),
        })?;

        let status = response.status().as_u16();
        trace!(uri = %self.uri, status, ?elapsed, "Response received");

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchFailure {
                error: ScrapeError::BodyRead(e.to_string()),
                elapsed: Some(elapsed),
            })?
            .to_vec();

        Ok(FetchResponse {
            status,
            body,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(uri: &str) -> TargetConfig {
        TargetConfig {
            uri: uri.to_string(),
            timeout_secs: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_malformed_uri_is_construction_error() {
        let fetcher = Fetcher::new(&target("not a uri")).unwrap();
        let failure = fetcher.fetch().await.unwrap_err();

        assert!(matches!(failure.error, ScrapeError::Construction(_)));
        assert!(failure.elapsed.is_none());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = Fetcher::new(&target(&format!("http://{}/metrics", addr))).unwrap();
        let failure = fetcher.fetch().await.unwrap_err();

        assert!(matches!(failure.error, ScrapeError::Transport(_)));
        assert!(failure.elapsed.is_some());
    }

    #[tokio::test]
    async fn test_insecure_fetcher_builds_and_fetches() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = axum::Router::new().route("/metrics", axum::routing::get(|| async { "{}" }));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let insecure = TargetConfig {
            insecure: true,
            ..target(&format!("http://{}/metrics", addr))
        };
        let fetcher = Fetcher::new(&insecure).unwrap();
        let response = fetcher.fetch().await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"{}");
    }

    #[tokio::test]
    async fn test_insecure_tls_handshake_failure_is_transport_error() {
        // Plain TCP peer that closes without speaking TLS.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let insecure = TargetConfig {
            insecure: true,
            ..target(&format!("https://{}/metrics", addr))
        };
        let fetcher = Fetcher::new(&insecure).unwrap();
        let failure = fetcher.fetch().await.unwrap_err();

        assert!(matches!(failure.error, ScrapeError::Transport(_)));
        assert!(failure.elapsed.is_some());
    }
}
