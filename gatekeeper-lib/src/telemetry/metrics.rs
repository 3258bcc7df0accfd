use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Meter, MeterProvider as _};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

pub mod labels {
    pub const TIER: &str = "tier";
    pub const REASON: &str = "reason";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

#[derive(Clone)]
pub struct Metrics {
    pub enforce_requests_total: Counter<u64>,
    pub enforce_allowed_total: Counter<u64>,
    pub enforce_denied_total: Counter<u64>,

    pub malformed_requests_total: Counter<u64>,
    pub blocks_recorded_total: Counter<u64>,
    pub mode_changes_total: Counter<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    fn new(meter: Meter) -> Self {
        Self {
            enforce_requests_total: meter
                .u64_counter("gatekeeper_enforce_requests_total")
                .with_description("Total number of enforcement requests evaluated")
                .build(),
            enforce_allowed_total: meter
                .u64_counter("gatekeeper_enforce_allowed_total")
                .with_description("Total number of enforcement requests allowed")
                .build(),
            enforce_denied_total: meter
                .u64_counter("gatekeeper_enforce_denied_total")
                .with_description("Total number of enforcement requests denied (rate limited or blocked)")
                .build(),

            malformed_requests_total: meter
                .u64_counter("gatekeeper_malformed_requests_total")
                .with_description("Total number of requests rejected as malformed (400)")
                .build(),
            blocks_recorded_total: meter
                .u64_counter("gatekeeper_blocks_recorded_total")
                .with_description("Total number of temporal blocks recorded")
                .build(),
            mode_changes_total: meter
                .u64_counter("gatekeeper_mode_changes_total")
                .with_description("Total number of enforcement mode changes via /mode")
                .build(),

            build_info: meter
                .u64_gauge("gatekeeper_build_info")
                .with_description("Build information (version, rust version)")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_verdict(&self, tier: &str, allowed: bool, reason: &str) {
        let attrs = &[
            KeyValue::new(labels::TIER, tier.to_string()),
            KeyValue::new(labels::REASON, reason.to_string()),
        ];
        self.enforce_requests_total.add(1, attrs);
        if allowed {
            self.enforce_allowed_total.add(1, attrs);
        } else {
            self.enforce_denied_total.add(1, attrs);
        }
    }

    pub fn record_malformed_request(&self) {
        self.malformed_requests_total.add(1, &[]);
    }

    pub fn record_block_recorded(&self) {
        self.blocks_recorded_total.add(1, &[]);
    }

    pub fn record_mode_change(&self, mode: &str) {
        self.mode_changes_total
            .add(1, &[KeyValue::new("mode", mode.to_string())]);
    }
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    // Take the meter from this provider, not the global one, so concurrently
    // constructed instances each record into their own registry.
    let meter = meter_provider.meter("gatekeeper");
    global::set_meter_provider(meter_provider);

    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
