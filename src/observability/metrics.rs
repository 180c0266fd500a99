use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub backend_calls_total: IntCounterVec,
    pub backend_call_seconds: HistogramVec,
    pub presence_publishes_total: IntCounterVec,
    pub offer_polls_total: IntCounterVec,
    pub trip_transitions_total: IntCounterVec,
    pub driver_online: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let backend_calls_total = IntCounterVec::new(
            Opts::new("backend_calls_total", "Backend calls by operation and outcome"),
            &["operation", "outcome"],
        )
        .expect("valid backend_calls_total metric");

        let backend_call_seconds = HistogramVec::new(
            HistogramOpts::new("backend_call_seconds", "Backend call latency in seconds"),
            &["operation"],
        )
        .expect("valid backend_call_seconds metric");

        let presence_publishes_total = IntCounterVec::new(
            Opts::new("presence_publishes_total", "Presence cycles by status and outcome"),
            &["status", "outcome"],
        )
        .expect("valid presence_publishes_total metric");

        let offer_polls_total = IntCounterVec::new(
            Opts::new("offer_polls_total", "Ride offer poll cycles by outcome"),
            &["outcome"],
        )
        .expect("valid offer_polls_total metric");

        let trip_transitions_total = IntCounterVec::new(
            Opts::new("trip_transitions_total", "Lifecycle transitions by target phase"),
            &["phase"],
        )
        .expect("valid trip_transitions_total metric");

        let driver_online = IntGauge::new("driver_online", "1 while the driver is online")
            .expect("valid driver_online metric");

        registry
            .register(Box::new(backend_calls_total.clone()))
            .expect("register backend_calls_total");
        registry
            .register(Box::new(backend_call_seconds.clone()))
            .expect("register backend_call_seconds");
        registry
            .register(Box::new(presence_publishes_total.clone()))
            .expect("register presence_publishes_total");
        registry
            .register(Box::new(offer_polls_total.clone()))
            .expect("register offer_polls_total");
        registry
            .register(Box::new(trip_transitions_total.clone()))
            .expect("register trip_transitions_total");
        registry
            .register(Box::new(driver_online.clone()))
            .expect("register driver_online");

        Self {
            registry,
            backend_calls_total,
            backend_call_seconds,
            presence_publishes_total,
            offer_polls_total,
            trip_transitions_total,
            driver_online,
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
