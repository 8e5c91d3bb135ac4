use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub dispatch_total: IntCounterVec,
    pub dispatch_latency_seconds: HistogramVec,
    pub movement_queue_depth: IntGauge,
    pub ride_status_transitions_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let dispatch_total = IntCounterVec::new(
            Opts::new("dispatch_total", "Total driver dispatch attempts by outcome"),
            &["outcome"],
        )
        .expect("valid dispatch_total metric");

        let dispatch_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "dispatch_latency_seconds",
                "Latency of driver dispatch in seconds",
            ),
            &["outcome"],
        )
        .expect("valid dispatch_latency_seconds metric");

        let movement_queue_depth = IntGauge::new(
            "movement_queue_depth",
            "Movement simulation jobs waiting in the queue",
        )
        .expect("valid movement_queue_depth metric");

        let ride_status_transitions_total = IntCounterVec::new(
            Opts::new(
                "ride_status_transitions_total",
                "Ride status transitions by target status",
            ),
            &["status"],
        )
        .expect("valid ride_status_transitions_total metric");

        registry
            .register(Box::new(dispatch_total.clone()))
            .expect("register dispatch_total");
        registry
            .register(Box::new(dispatch_latency_seconds.clone()))
            .expect("register dispatch_latency_seconds");
        registry
            .register(Box::new(movement_queue_depth.clone()))
            .expect("register movement_queue_depth");
        registry
            .register(Box::new(ride_status_transitions_total.clone()))
            .expect("register ride_status_transitions_total");

        Self {
            registry,
            dispatch_total,
            dispatch_latency_seconds,
            movement_queue_depth,
            ride_status_transitions_total,
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
