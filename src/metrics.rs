//! Query metrics and tracing spans.
//!
//! With the `metrics` feature, [`METRICS`] records every driver call as an
//! OpenTelemetry counter and duration histogram. A Prometheus exporter reads
//! them into [`BuoyMetrics::registry`]; [`BuoyMetrics::encode`] renders the
//! text exposition format for a scrape endpoint.
//! With the `tracing` feature, driver calls and connection setup run inside
//! spans from [`tracing_helpers`].

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics::SdkMeterProvider;
#[cfg(feature = "metrics")]
use prometheus::{Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::time::Duration;

#[cfg(feature = "metrics")]
pub static METRICS: Lazy<BuoyMetrics> = Lazy::new(BuoyMetrics::init);

#[cfg(feature = "metrics")]
pub struct BuoyMetrics {
    pub registry: Registry,
    pub provider: SdkMeterProvider,
    pub queries_total: Counter<u64>,
    pub query_errors_total: Counter<u64>,
    pub query_duration: Histogram<f64>,
    pub connection_duration: Histogram<f64>,
}

#[cfg(feature = "metrics")]
impl BuoyMetrics {
    pub fn init() -> Self {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .expect("failed to build prometheus exporter");
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("buoy");

        let queries_total = meter
            .u64_counter("buoy_queries_total")
            .with_description("Total statements sent to the database")
            .build();

        let query_errors_total = meter
            .u64_counter("buoy_query_errors_total")
            .with_description("Statements the database rejected")
            .build();

        let query_duration = meter
            .f64_histogram("buoy_query_duration_seconds")
            .with_description("Duration of driver calls")
            .build();

        let connection_duration = meter
            .f64_histogram("buoy_connection_duration_seconds")
            .with_description("Time spent opening connections")
            .build();

        Self {
            registry,
            provider,
            queries_total,
            query_errors_total,
            query_duration,
            connection_duration,
        }
    }

    pub fn record_query(&self, elapsed: Duration) {
        self.queries_total.add(1, &[]);
        self.query_duration.record(elapsed.as_secs_f64(), &[]);
    }

    pub fn record_query_error(&self) {
        self.query_errors_total.add(1, &[]);
    }

    pub fn record_connection(&self, elapsed: Duration) {
        self.connection_duration.record(elapsed.as_secs_f64(), &[]);
    }

    /// Current metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn execute_query_span(sql: &str) -> Span {
        tracing::info_span!("buoy.query", sql = %sql)
    }

    pub fn open_connection_span() -> Span {
        tracing::info_span!("buoy.connect")
    }
}
