use prometheus::{histogram_opts, opts, Counter, Encoder, Histogram, IntCounterVec, Registry, TextEncoder};
use std::time::Duration;
use tracing::{debug, info};

/// Dispense counters and latency
#[derive(Debug, Clone)]
pub struct FaucetMetrics {
    registry: Registry,

    /// Requests by outcome: `success` or a `FaucetError::kind`
    pub dispense_requests_total: IntCounterVec,
    pub sompi_dispensed_total: Counter,
    pub dispense_duration: Histogram,
}

impl FaucetMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let dispense_requests_total = IntCounterVec::new(
            opts!("faucet_dispense_requests_total", "Dispense requests by outcome"),
            &["outcome"],
        )?;

        let sompi_dispensed_total = Counter::with_opts(opts!(
            "faucet_sompi_dispensed_total",
            "Total sompi sent to requesters"
        ))?;

        let dispense_duration = Histogram::with_opts(histogram_opts!(
            "faucet_dispense_duration_seconds",
            "Time spent handling a dispense request"
        ))?;

        registry.register(Box::new(dispense_requests_total.clone()))?;
        registry.register(Box::new(sompi_dispensed_total.clone()))?;
        registry.register(Box::new(dispense_duration.clone()))?;

        info!("Metrics system initialized");
        Ok(Self {
            registry,
            dispense_requests_total,
            sompi_dispensed_total,
            dispense_duration,
        })
    }

    pub fn record_success(&self, sompi: u64, elapsed: Duration) {
        self.dispense_requests_total.with_label_values(&["success"]).inc();
        self.sompi_dispensed_total.inc_by(sompi as f64);
        self.dispense_duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_failure(&self, kind: &str, elapsed: Duration) {
        self.dispense_requests_total.with_label_values(&[kind]).inc();
        self.dispense_duration.observe(elapsed.as_secs_f64());
        debug!("Recorded dispense failure: {}", kind);
    }

    /// Text exposition format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
