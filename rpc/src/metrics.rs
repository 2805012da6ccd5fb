//! Prometheus metrics for the bridge.
//!
//! [`BridgeMetrics`] owns a dedicated [`Registry`] that `GET /metrics`
//! encodes into the Prometheus text exposition format.

use std::time::Duration;

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_with_registry, Encoder, HistogramOpts, HistogramVec, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};

pub struct BridgeMetrics {
    pub registry: Registry,

    /// Contract executions by route and outcome.
    pub contract_executions: IntCounterVec,
    /// Wall time of a contract execution, host calls included, in milliseconds.
    pub execution_duration_ms: HistogramVec,
    /// Participants with a registered channel. Refreshed on scrape.
    pub connected_clients: IntGauge,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let contract_executions = register_int_counter_vec_with_registry!(
            Opts::new(
                "bridge_contract_executions_total",
                "Contract executions by route and outcome"
            ),
            &["route", "outcome"],
            registry
        )
        .expect("failed to register contract_executions counter");

        // 1 ms to ~9 min, covering the full quorum call timeout.
        let execution_duration_ms = register_histogram_vec_with_registry!(
            HistogramOpts::new(
                "bridge_execution_duration_ms",
                "Contract execution time in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 20).unwrap()),
            &["route"],
            registry
        )
        .expect("failed to register execution_duration_ms histogram");

        let connected_clients = register_int_gauge_with_registry!(
            Opts::new(
                "bridge_connected_clients",
                "Quorum participants with a registered channel"
            ),
            registry
        )
        .expect("failed to register connected_clients gauge");

        Self {
            registry,
            contract_executions,
            execution_duration_ms,
            connected_clients,
        }
    }

    pub fn observe_execution(&self, route: &str, outcome: &str, elapsed: Duration) {
        self.contract_executions
            .with_label_values(&[route, outcome])
            .inc();
        self.execution_duration_ms
            .with_label_values(&[route])
            .observe(elapsed.as_secs_f64() * 1000.0);
    }

    /// Text exposition of every metric in the registry.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
