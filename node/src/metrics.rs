// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Prometheus Metrics
//!
//! Operational metrics for the settlement host, scraped at `/metrics` on
//! the configured metrics port.
//!
//! Everything lives in a dedicated [`prometheus::Registry`] with a `tally`
//! prefix so nothing collides with the default global registry.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use tally_contracts::{CallOutcome, ContractError, Executed};

/// Prometheus handles for the node.
///
/// Prometheus handles are reference counted internally, so cloning is cheap
/// and every clone updates the same series.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Calls handled, labelled by call name and outcome (`ok` or the error kind).
    pub calls_total: IntCounterVec,
    /// Receipts settled through `post()`.
    pub receipts_settled_total: IntCounter,
    /// Receipts that could not be covered and slashed the payee's deposit.
    pub slashes_total: IntCounter,
    /// Users in the registry.
    pub users_registered: IntGauge,
    /// Time spent executing a call, lock wait included.
    pub call_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("tally".into()), None)?;

        let calls_total = IntCounterVec::new(
            Opts::new("calls_total", "Contract calls handled, by call and outcome"),
            &["call", "outcome"],
        )?;
        registry.register(Box::new(calls_total.clone()))?;

        let receipts_settled_total = IntCounter::new(
            "receipts_settled_total",
            "Receipts settled through post()",
        )?;
        registry.register(Box::new(receipts_settled_total.clone()))?;

        let slashes_total = IntCounter::new(
            "slashes_total",
            "Receipts that exceeded the payee balance and slashed its deposit",
        )?;
        registry.register(Box::new(slashes_total.clone()))?;

        let users_registered =
            IntGauge::new("users_registered", "Number of registered users")?;
        registry.register(Box::new(users_registered.clone()))?;

        let call_latency_seconds = Histogram::with_opts(
            HistogramOpts::new("call_latency_seconds", "Contract call latency in seconds").buckets(
                vec![
                    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
                ],
            ),
        )?;
        registry.register(Box::new(call_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            calls_total,
            receipts_settled_total,
            slashes_total,
            users_registered,
            call_latency_seconds,
        })
    }

    /// Record one executed (or rejected) call.
    pub fn observe_call(
        &self,
        call: &str,
        result: Result<&Executed, &ContractError>,
        elapsed: Duration,
    ) {
        self.call_latency_seconds.observe(elapsed.as_secs_f64());
        match result {
            Ok(executed) => {
                self.calls_total.with_label_values(&[call, "ok"]).inc();
                match &executed.outcome {
                    CallOutcome::Registered { index } => {
                        self.users_registered
                            .set(i64::try_from(*index).unwrap_or(i64::MAX));
                    }
                    CallOutcome::Settled(summary) => {
                        self.receipts_settled_total
                            .inc_by(summary.receipts.len() as u64);
                        self.slashes_total.inc_by(summary.slashed_count() as u64);
                    }
                    CallOutcome::WithdrawalInitiated { .. }
                    | CallOutcome::WithdrawalProcessed { .. } => {}
                }
            }
            Err(err) => {
                self.calls_total.with_label_values(&[call, err.kind()]).inc();
            }
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_contracts::CommitInfo;

    fn registered(index: u64) -> Executed {
        Executed {
            call: "register",
            outcome: CallOutcome::Registered { index },
            commit: CommitInfo {
                entries: 2,
                digest: [0; 32],
            },
        }
    }

    #[test]
    fn registration_moves_the_user_gauge() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.observe_call("register", Ok(&registered(3)), Duration::from_millis(2));
        assert_eq!(metrics.users_registered.get(), 3);
        assert_eq!(
            metrics
                .calls_total
                .with_label_values(&["register", "ok"])
                .get(),
            1
        );
    }

    #[test]
    fn rejections_are_labelled_by_kind() {
        let metrics = NodeMetrics::new().unwrap();
        let rejected = ContractError::InvalidAggregateSignature;
        metrics.observe_call("post", Err(&rejected), Duration::from_millis(1));

        let text = metrics.encode().unwrap();
        assert!(text.contains("tally_calls_total"));
        assert!(text.contains("outcome=\"invalid_aggregate_signature\""));
    }
}
