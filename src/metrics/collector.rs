// src/metrics/collector.rs
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;
use anyhow::Result;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

/// Outcome label of a healthz request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The proxy answered; the relayed status may still be non-2xx.
    Relayed,
    UpstreamError,
}

impl ProbeOutcome {
    fn as_label(&self) -> &'static str {
        match self {
            ProbeOutcome::Relayed => "relayed",
            ProbeOutcome::UpstreamError => "upstream_error",
        }
    }
}

pub struct MetricsCollector {
    pub probes_total: IntCounterVec,
    pub probe_duration_seconds: HistogramVec,
    pub upstream_responses_total: IntCounterVec,
    pub target_requests_total: IntCounter,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let probes_total = IntCounterVec::new(
            Opts::new("healthz_probes_total", "Total number of /healthz probes"),
            &["outcome"],
        )?;
        registry.register(Box::new(probes_total.clone()))?;

        let probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "healthz_probe_duration_seconds",
                "Round-trip time of the proxied healthz request in seconds",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;

        let upstream_responses_total = IntCounterVec::new(
            Opts::new(
                "healthz_upstream_responses_total",
                "Responses relayed from the proxy by status code",
            ),
            &["status_code"],
        )?;
        registry.register(Box::new(upstream_responses_total.clone()))?;

        let target_requests_total = IntCounter::new(
            "healthz_target_requests_total",
            "Requests served by the target endpoint",
        )?;
        registry.register(Box::new(target_requests_total.clone()))?;

        Ok(Self {
            probes_total,
            probe_duration_seconds,
            upstream_responses_total,
            target_requests_total,
        })
    }

    pub fn record_probe(&self, outcome: ProbeOutcome, duration: std::time::Duration) {
        let label = outcome.as_label();
        self.probes_total.with_label_values(&[label]).inc();
        self.probe_duration_seconds
            .with_label_values(&[label])
            .observe(duration.as_secs_f64());
    }

    pub fn record_upstream_status(&self, status_code: u16) {
        self.upstream_responses_total
            .with_label_values(&[&status_code.to_string()])
            .inc();
    }

    pub fn record_target_request(&self) {
        self.target_requests_total.inc();
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
