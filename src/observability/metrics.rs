use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub pickup_requests_total: IntCounterVec,
    pub pending_requests: IntGauge,
    pub optimize_requests_total: IntCounterVec,
    pub optimize_latency_seconds: HistogramVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let pickup_requests_total = IntCounterVec::new(
            Opts::new("pickup_requests_total", "Pickup request store events"),
            &["event"],
        )
        .expect("valid pickup_requests_total metric");

        let pending_requests =
            IntGauge::new("pending_requests", "Pickup requests awaiting acceptance")
                .expect("valid pending_requests metric");

        let optimize_requests_total = IntCounterVec::new(
            Opts::new("optimize_requests_total", "Optimize calls by outcome"),
            &["outcome"],
        )
        .expect("valid optimize_requests_total metric");

        let optimize_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "optimize_latency_seconds",
                "Latency of stop-sequence optimization in seconds",
            ),
            &["outcome"],
        )
        .expect("valid optimize_latency_seconds metric");

        registry
            .register(Box::new(pickup_requests_total.clone()))
            .expect("register pickup_requests_total");
        registry
            .register(Box::new(pending_requests.clone()))
            .expect("register pending_requests");
        registry
            .register(Box::new(optimize_requests_total.clone()))
            .expect("register optimize_requests_total");
        registry
            .register(Box::new(optimize_latency_seconds.clone()))
            .expect("register optimize_latency_seconds");

        Self {
            registry,
            pickup_requests_total,
            pending_requests,
            optimize_requests_total,
            optimize_latency_seconds,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
