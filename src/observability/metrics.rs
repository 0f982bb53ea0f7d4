use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub bookings_created_total: IntCounterVec,
    pub booking_transitions_total: IntCounterVec,
    pub store_op_latency_seconds: HistogramVec,
    pub active_bookings: IntGauge,
    pub notifications_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let bookings_created_total = IntCounterVec::new(
            Opts::new("bookings_created_total", "Bookings created by kind"),
            &["kind"],
        )
        .expect("valid bookings_created_total metric");

        let booking_transitions_total = IntCounterVec::new(
            Opts::new(
                "booking_transitions_total",
                "Lifecycle transition attempts by outcome",
            ),
            &["outcome"],
        )
        .expect("valid booking_transitions_total metric");

        let store_op_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "store_op_latency_seconds",
                "Latency of booking store operations in seconds",
            ),
            &["op"],
        )
        .expect("valid store_op_latency_seconds metric");

        let active_bookings = IntGauge::new(
            "active_bookings",
            "Bookings not yet completed or cancelled, as of the last poll",
        )
        .expect("valid active_bookings metric");

        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Emergency contact alerts by outcome"),
            &["outcome"],
        )
        .expect("valid notifications_total metric");

        registry
            .register(Box::new(bookings_created_total.clone()))
            .expect("register bookings_created_total");
        registry
            .register(Box::new(booking_transitions_total.clone()))
            .expect("register booking_transitions_total");
        registry
            .register(Box::new(store_op_latency_seconds.clone()))
            .expect("register store_op_latency_seconds");
        registry
            .register(Box::new(active_bookings.clone()))
            .expect("register active_bookings");
        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");

        Self {
            registry,
            bookings_created_total,
            booking_transitions_total,
            store_op_latency_seconds,
            active_bookings,
            notifications_total,
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
