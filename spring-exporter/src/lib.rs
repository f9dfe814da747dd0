//! Prometheus exporter for Spring Boot JSON metrics endpoints.
//!
//! Every Prometheus pull triggers one scrape of the configured endpoint. The
//! flat `{"key": number}` document it returns is republished with each key
//! sanitized into a valid metric name under a namespace, alongside two
//! meta-metrics describing the scrape itself.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ Spring endpoint │<────│    Collector    │<────│   HTTP Server   │
//! │  (JSON /metrics)│────>│ (fetch + map)   │────>│   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Exposed metrics
//!
//! - `<namespace>_response_duration`: round trip of the scrape, in seconds
//! - `<namespace>_up`: 1 if any HTTP response was received, 0 otherwise
//! - `<namespace>_<sanitized key>`: one untyped sample per payload entry
//!
//! # Usage
//!
//! ```bash
//! spring-exporter --uri http://app:8080/metrics --namespace spring
//! ```
//!
//! See [`config::ExporterConfig`] for file-based configuration.

pub mod collector;
pub mod config;
pub mod error;
pub mod exposition;
pub mod fetcher;
pub mod http;
pub mod mapping;
pub mod measurement;
pub mod payload;

pub use collector::{CollectorStats, SharedCollector, SpringCollector};
pub use config::{ExporterConfig, LogFormat, LoggingConfig, TargetConfig};
pub use error::{Result, ScrapeError};
pub use http::HttpServer;
pub use measurement::{Measurement, MeasurementSink};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}
