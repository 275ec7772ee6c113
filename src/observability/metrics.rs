use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub rider_assignments_total: IntCounterVec,
    pub payments_recorded_total: IntCounterVec,
    pub saga_compensations_total: IntCounterVec,
    pub auth_rejections_total: IntCounterVec,
    pub riders_in_delivery: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let rider_assignments_total = IntCounterVec::new(
            Opts::new("rider_assignments_total", "Rider assignments by outcome"),
            &["outcome"],
        )
        .expect("valid rider_assignments_total metric");

        let payments_recorded_total = IntCounterVec::new(
            Opts::new("payments_recorded_total", "Payment recordings by outcome"),
            &["outcome"],
        )
        .expect("valid payments_recorded_total metric");

        let saga_compensations_total = IntCounterVec::new(
            Opts::new(
                "saga_compensations_total",
                "Compensating writes run after a failed multi-write operation",
            ),
            &["operation", "outcome"],
        )
        .expect("valid saga_compensations_total metric");

        let auth_rejections_total = IntCounterVec::new(
            Opts::new("auth_rejections_total", "Rejected requests by reason"),
            &["reason"],
        )
        .expect("valid auth_rejections_total metric");

        let riders_in_delivery = IntGauge::new(
            "riders_in_delivery",
            "Riders currently marked in-delivery by this process",
        )
        .expect("valid riders_in_delivery metric");

        registry
            .register(Box::new(rider_assignments_total.clone()))
            .expect("register rider_assignments_total");
        registry
            .register(Box::new(payments_recorded_total.clone()))
            .expect("register payments_recorded_total");
        registry
            .register(Box::new(saga_compensations_total.clone()))
            .expect("register saga_compensations_total");
        registry
            .register(Box::new(auth_rejections_total.clone()))
            .expect("register auth_rejections_total");
        registry
            .register(Box::new(riders_in_delivery.clone()))
            .expect("register riders_in_delivery");

        Self {
            registry,
            rider_assignments_total,
            payments_recorded_total,
            saga_compensations_total,
            auth_rejections_total,
            riders_in_delivery,
        }
    }

    pub fn record_auth_rejection(&self, reason: &str) {
        self.auth_rejections_total.with_label_values(&[reason]).inc();
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
