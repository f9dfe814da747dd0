//! Scrape cycle: fetch the Spring endpoint and publish its values.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::config::TargetConfig;
use crate::error::{Result, ScrapeError};
use crate::exposition::ExpositionWriter;
use crate::fetcher::Fetcher;
use crate::mapping::{build_metric_name, is_valid_metric_name, sanitize_key};
use crate::measurement::{Measurement, MeasurementSink};
use crate::payload::RawPayload;

const UP_HELP: &str = "Could spring endpoint be reached";
const DURATION_HELP: &str = "How long the spring endpoint took to deliver the metrics";

/// Collector statistics.
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    /// Total scrape cycles run.
    pub cycles: u64,
    /// Cycles that published the payload.
    pub cycles_succeeded: u64,
    /// Request construction failures.
    pub construction_errors: u64,
    /// DNS, connect, TLS or timeout failures.
    pub transport_errors: u64,
    /// Non-200 responses.
    pub status_errors: u64,
    /// Body read failures.
    pub body_read_errors: u64,
    /// Bodies that were not a flat numeric JSON object.
    pub parse_errors: u64,
    /// Payload entries skipped because of an invalid or duplicate name.
    pub entries_skipped: u64,
}

/// Publishes the Spring endpoint's metrics, one full scrape per call.
///
/// Calls to [`collect`](Self::collect) are serialized: a second caller waits
/// until the running cycle has emitted everything, then runs its own cycle.
pub struct SpringCollector {
    fetcher: Fetcher,
    namespace: String,
    up_name: String,
    duration_name: String,
    /// Held for the whole cycle.
    cycle_lock: Mutex<()>,
    stats: RwLock<CollectorStats>,
}

impl SpringCollector {
    /// Create a collector for the given target.
    pub fn new(target: &TargetConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(target)?,
            namespace: target.namespace.clone(),
            up_name: build_metric_name(&target.namespace, "up"),
            duration_name: build_metric_name(&target.namespace, "response_duration"),
            cycle_lock: Mutex::new(()),
            stats: RwLock::new(CollectorStats::default()),
        })
    }

    /// Run one scrape cycle, streaming measurements into `sink`.
    ///
    /// Emits `response_duration` then `up`, then one untyped measurement per
    /// payload entry. Errors are logged here and also returned; on error no
    /// payload measurement is emitted. Returns the number of payload
    /// measurements on success.
    pub async fn collect<S: MeasurementSink>(&self, sink: &mut S) -> Result<usize> {
        let _guard = self.cycle_lock.lock().await;

        let result = self.scrape(sink).await;
        self.record_outcome(&result);

        if let Err(e) = &result {
            error!(
                uri = %self.fetcher.uri(),
                kind = e.kind(),
                "Error scraping spring endpoint: {}",
                e
            );
        }

        result
    }

    /// Run one scrape cycle and render it in Prometheus text format.
    pub async fn render(&self) -> String {
        let mut writer = ExpositionWriter::new();
        // Already logged by collect; the meta-measurements carry the outcome.
        let _ = self.collect(&mut writer).await;
        writer.finish()
    }

    /// Get collector statistics.
    pub fn stats(&self) -> CollectorStats {
        self.stats.read().clone()
    }

    async fn scrape<S: MeasurementSink>(&self, sink: &mut S) -> Result<usize> {
        // Fetch; duration and up are emitted on every path
        let response = match self.fetcher.fetch().await {
            Ok(response) => response,
            Err(failure) => {
                let up = failure.error.response_received();
                self.emit_meta(sink, failure.elapsed.unwrap_or_default(), up);
                return Err(failure.error);
            }
        };

        // Any response at all counts as up, whatever the status
        self.emit_meta(sink, response.elapsed, true);

        if response.status != 200 {
            return Err(ScrapeError::Status(response.status));
        }

        // Parse before emitting anything so errors never publish a partial payload
        let payload = RawPayload::parse(&response.body)?;
        debug!("Result has {} rows", payload.len());

        Ok(self.emit_payload(sink, payload))
    }

    fn emit_meta<S: MeasurementSink>(&self, sink: &mut S, elapsed: Duration, up: bool) {
        sink.emit(Measurement::gauge(
            &self.duration_name,
            DURATION_HELP,
            elapsed.as_secs_f64(),
        ));
        sink.emit(Measurement::gauge(
            &self.up_name,
            UP_HELP,
            if up { 1.0 } else { 0.0 },
        ));
    }

    fn emit_payload<S: MeasurementSink>(&self, sink: &mut S, payload: RawPayload) -> usize {
        // Meta names are taken; payload keys may not shadow them
        let mut seen: HashSet<String> = HashSet::with_capacity(payload.len() + 2);
        seen.insert(self.up_name.clone());
        seen.insert(self.duration_name.clone());

        let mut emitted = 0;
        let mut skipped = 0;

        for (key, value) in payload {
            let snake_key = sanitize_key(&key);
            let name = build_metric_name(&self.namespace, &snake_key);

            if !is_valid_metric_name(&name) {
                warn!(
                    key = %key,
                    name = %name,
                    "Skipping key that does not form a valid metric name"
                );
                skipped += 1;
                continue;
            }
            if !seen.insert(name.clone()) {
                warn!(
                    key = %key,
                    name = %name,
                    "Skipping key that collides with an earlier metric"
                );
                skipped += 1;
                continue;
            }

            debug!(
                "Adding key {} (originally {}) with value {}",
                snake_key, key, value
            );
            sink.emit(Measurement::untyped(name, key, value));
            emitted += 1;
        }

        if skipped > 0 {
            self.stats.write().entries_skipped += skipped;
        }

        emitted
    }

    fn record_outcome(&self, result: &Result<usize>) {
        let mut stats = self.stats.write();
        stats.cycles += 1;

        match result {
            Ok(_) => stats.cycles_succeeded += 1,
            Err(ScrapeError::Client(_)) | Err(ScrapeError::Construction(_)) => {
                stats.construction_errors += 1
            }
            Err(ScrapeError::Transport(_)) => stats.transport_errors += 1,
            Err(ScrapeError::Status(_)) => stats.status_errors += 1,
            Err(ScrapeError::BodyRead(_)) => stats.body_read_errors += 1,
            Err(ScrapeError::Parse(_)) => stats.parse_errors += 1,
        }
    }
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<SpringCollector>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ValueKind;

    fn unreachable_target(namespace: &str) -> TargetConfig {
        TargetConfig {
            uri: "http://127.0.0.1:1/metrics".to_string(),
            namespace: namespace.to_string(),
            timeout_secs: 2,
            ..Default::default()
        }
    }

    fn collector(namespace: &str) -> SpringCollector {
        SpringCollector::new(&unreachable_target(namespace)).unwrap()
    }

    #[test]
    fn test_meta_names() {
        let c = collector("spring");
        assert_eq!(c.up_name, "spring_up");
        assert_eq!(c.duration_name, "spring_response_duration");

        let c = collector("");
        assert_eq!(c.up_name, "up");
        assert_eq!(c.duration_name, "response_duration");
    }

    #[test]
    fn test_emit_meta_order() {
        let c = collector("spring");
        let mut sink: Vec<Measurement> = Vec::new();
        c.emit_meta(&mut sink, Duration::from_millis(250), false);

        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].name, "spring_response_duration");
        assert_eq!(sink[0].value, 0.25);
        assert_eq!(sink[0].kind, ValueKind::Gauge);
        assert_eq!(sink[1].name, "spring_up");
        assert_eq!(sink[1].value, 0.0);
    }

    #[test]
    fn test_emit_payload_sanitizes_and_keeps_original_help() {
        let c = collector("spring");
        let payload =
            RawPayload::parse(br#"{"jvm.memory.used": 12345.0, "disk free": 999.0}"#).unwrap();

        let mut sink: Vec<Measurement> = Vec::new();
        let emitted = c.emit_payload(&mut sink, payload);

        assert_eq!(emitted, 2);
        assert_eq!(
            sink[0],
            Measurement::untyped("spring_jvm_memory_used", "jvm.memory.used", 12345.0)
        );
        assert_eq!(
            sink[1],
            Measurement::untyped("spring_disk_free", "disk free", 999.0)
        );
    }

    #[test]
    fn test_emit_payload_skips_colliding_names() {
        let c = collector("spring");
        let payload = RawPayload::parse(br#"{"a.b": 1, "a-b": 2, "up": 3}"#).unwrap();

        let mut sink: Vec<Measurement> = Vec::new();
        let emitted = c.emit_payload(&mut sink, payload);

        assert_eq!(emitted, 1);
        assert_eq!(sink[0].name, "spring_a_b");
        assert_eq!(sink[0].help, "a.b");
        assert_eq!(c.stats().entries_skipped, 2);
    }

    #[test]
    fn test_emit_payload_skips_invalid_names() {
        let c = collector("");
        let payload = RawPayload::parse(br#"{"": 1, "9lives": 2, "ok": 3}"#).unwrap();

        let mut sink: Vec<Measurement> = Vec::new();
        let emitted = c.emit_payload(&mut sink, payload);

        assert_eq!(emitted, 1);
        assert_eq!(sink[0].name, "ok");
    }

    #[test]
    fn test_emit_payload_empty_key_with_namespace() {
        let c = collector("spring");
        let payload = RawPayload::parse(br#"{"": 1}"#).unwrap();

        let mut sink: Vec<Measurement> = Vec::new();
        assert_eq!(c.emit_payload(&mut sink, payload), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_collect_transport_error_emits_up_zero() {
        let c = collector("spring");
        let mut sink: Vec<Measurement> = Vec::new();

        let result = c.collect(&mut sink).await;

        assert!(matches!(result, Err(ScrapeError::Transport(_))));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].name, "spring_response_duration");
        assert!(sink[0].value >= 0.0);
        assert_eq!(sink[1].name, "spring_up");
        assert_eq!(sink[1].value, 0.0);

        let stats = c.stats();
        assert_eq!(stats.cycles, 1);
        assert_eq!(stats.transport_errors, 1);
        assert_eq!(stats.cycles_succeeded, 0);
    }

    #[tokio::test]
    async fn test_collect_construction_error_emits_zero_meta() {
        let target = TargetConfig {
            uri: "not a uri".to_string(),
            ..Default::default()
        };
        let c = SpringCollector::new(&target).unwrap();
        let mut sink: Vec<Measurement> = Vec::new();

        let result = c.collect(&mut sink).await;

        assert!(matches!(result, Err(ScrapeError::Construction(_))));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].value, 0.0);
        assert_eq!(sink[1].value, 0.0);
        assert_eq!(c.stats().construction_errors, 1);
    }
}
