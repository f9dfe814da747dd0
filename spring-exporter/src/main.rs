//! Prometheus exporter for Spring Boot JSON metrics endpoints.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use spring_exporter::{ExporterConfig, HttpServer, SpringCollector};

/// Prometheus exporter for Spring Boot JSON metrics endpoints.
#[derive(Parser, Debug)]
#[command(name = "spring-exporter")]
#[command(about = "Export a Spring JSON metrics endpoint as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long, env = "SPRING_EXPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP listen address (overrides config).
    #[arg(long, env = "SPRING_EXPORTER_LISTEN")]
    listen: Option<String>,

    /// Spring metrics endpoint URI (overrides config).
    #[arg(long, env = "SPRING_EXPORTER_URI")]
    uri: Option<String>,

    /// Metric namespace (overrides config).
    #[arg(long, env = "SPRING_EXPORTER_NAMESPACE")]
    namespace: Option<String>,

    /// Skip TLS certificate verification of the endpoint.
    #[arg(long, env = "SPRING_EXPORTER_INSECURE")]
    insecure: bool,

    /// Basic auth username for the endpoint.
    #[arg(long, env = "SPRING_EXPORTER_BASIC_AUTH_USER")]
    basic_auth_user: Option<String>,

    /// Basic auth password for the endpoint.
    #[arg(long, env = "SPRING_EXPORTER_BASIC_AUTH_PASSWORD", hide_env_values = true)]
    basic_auth_password: Option<String>,

    /// Request timeout in seconds (overrides config).
    #[arg(long, env = "SPRING_EXPORTER_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, env = "SPRING_EXPORTER_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    /// Apply command line overrides on top of the loaded configuration.
    fn apply(self, config: &mut ExporterConfig) {
        if let Some(listen) = self.listen {
            config.server.listen = listen;
        }
        if let Some(uri) = self.uri {
            config.target.uri = uri;
        }
        if let Some(namespace) = self.namespace {
            config.target.namespace = namespace;
        }
        if self.insecure {
            config.target.insecure = true;
        }
        if let Some(user) = self.basic_auth_user {
            config.target.basic_auth_user = user;
        }
        if let Some(password) = self.basic_auth_password {
            config.target.basic_auth_password = password;
        }
        if let Some(timeout) = self.timeout_secs {
            config.target.timeout_secs = timeout;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => ExporterConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => ExporterConfig::default(),
    };
    // CLI and environment override the file
    args.apply(&mut config);
    config.validate()?;

    // Initialize logging
    spring_exporter::init_tracing(&config.logging)?;

    info!(
        uri = %config.target.uri,
        namespace = %config.target.namespace,
        insecure = config.target.insecure,
        timeout_secs = config.target.timeout_secs,
        "Starting Spring exporter"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Create the collector
    let collector = Arc::new(SpringCollector::new(&config.target)?);

    // Parse listen address
    let listen_addr = config
        .server
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    // Start HTTP server
    let http_server = HttpServer::new(collector.clone(), listen_addr, config.server.path.clone());
    let mut http_task = tokio::spawn(http_server.run(shutdown_rx));

    // Wait for a shutdown signal, or for the server to stop on its own
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
        result = &mut http_task => {
            // Nothing is serving metrics any more; exit instead of idling
            let err = match result {
                Ok(Ok(())) => anyhow::anyhow!("HTTP server stopped unexpectedly"),
                Ok(Err(e)) => e,
                Err(e) => anyhow::anyhow!("HTTP server task failed: {}", e),
            };
            error!("HTTP server error: {}", err);
            return Err(err);
        }
    }

    // Signal shutdown; the server may already be gone
    let _ = shutdown_tx.send(true);

    // Wait for the server to drain
    match tokio::time::timeout(Duration::from_secs(5), http_task).await {
        Ok(Ok(Err(e))) => error!("HTTP server error: {}", e),
        Ok(Err(e)) => error!("HTTP server task failed: {}", e),
        Err(_) => warn!("HTTP server did not stop within 5s"),
        Ok(Ok(Ok(()))) => {}
    }

    // Print final stats
    let stats = collector.stats();
    info!(
        cycles = stats.cycles,
        cycles_succeeded = stats.cycles_succeeded,
        construction_errors = stats.construction_errors,
        transport_errors = stats.transport_errors,
        status_errors = stats.status_errors,
        body_read_errors = stats.body_read_errors,
        parse_errors = stats.parse_errors,
        entries_skipped = stats.entries_skipped,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
