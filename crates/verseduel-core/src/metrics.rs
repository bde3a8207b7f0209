use anyhow::Result;
use once_cell::sync::OnceCell;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{KeyValue, global};
use tracing::info;

struct DuelMetrics {
    sessions: Counter<u64>,
    duration_ms: Histogram<f64>,
    degraded_reports: Counter<u64>,
}

static METRICS: OnceCell<DuelMetrics> = OnceCell::new();

fn handles() -> &'static DuelMetrics {
    METRICS.get_or_init(|| {
        let meter: Meter = global::meter("verseduel.session");
        DuelMetrics {
            sessions: meter
                .u64_counter("duel_sessions_total")
                .with_description("Total duel sessions by outcome status")
                .init(),
            duration_ms: meter
                .f64_histogram("duel_session_duration_ms")
                .with_description("Wall-clock duel duration in milliseconds")
                .init(),
            degraded_reports: meter
                .u64_counter("degraded_reports_total")
                .with_description("Judge reports parsed with one or more defaulted fields")
                .init(),
        }
    })
}

/// Hint to operators that OTEL metrics export can be configured externally.
pub fn init_metrics_from_env(service_name: &str) -> Result<()> {
    if std::env::var("VERSEDUEL_OTEL_METRICS_ENDPOINT").is_ok() {
        info!(
            target = "telemetry",
            "VERSEDUEL_OTEL_METRICS_ENDPOINT detected for {service_name}. Configure an OTLP meter provider in your deployment to export duel metrics."
        );
    }
    Ok(())
}

/// Record OTEL metrics for one duel session (no-op if no provider installed).
pub fn record_session_metrics(status: &str, duration_ms: u64, degraded_report: bool) {
    let metrics = handles();
    let attrs = [KeyValue::new("status", status.to_string())];

    metrics.sessions.add(1, &attrs);
    metrics.duration_ms.record(duration_ms as f64, &attrs);

    if degraded_report {
        metrics.degraded_reports.add(1, &attrs);
    }
}
