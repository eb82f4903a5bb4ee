use once_cell::sync::OnceCell;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{KeyValue, global};

struct PipelineMetrics {
    stages: Counter<u64>,
    stage_duration_ms: Histogram<f64>,
    provider_requests: Counter<u64>,
}

static METRICS: OnceCell<PipelineMetrics> = OnceCell::new();

fn handles() -> &'static PipelineMetrics {
    METRICS.get_or_init(|| {
        let meter: Meter = global::meter("trendscout.pipeline");
        PipelineMetrics {
            stages: meter
                .u64_counter("pipeline_stage_total")
                .with_description("Pipeline stage executions by outcome")
                .init(),
            stage_duration_ms: meter
                .f64_histogram("pipeline_stage_duration_ms")
                .with_description("Pipeline stage runtime in milliseconds")
                .init(),
            provider_requests: meter
                .u64_counter("provider_requests_total")
                .with_description("Provider search requests by provider and status")
                .init(),
        }
    })
}

/// Record a finished pipeline stage (no-op if no meter provider is installed).
pub fn record_stage(stage: &str, outcome: &str, duration_ms: u64) {
    let metrics = handles();
    let attrs = [
        KeyValue::new("stage", stage.to_string()),
        KeyValue::new("outcome", outcome.to_string()),
    ];
    metrics.stages.add(1, &attrs);
    metrics
        .stage_duration_ms
        .record(duration_ms as f64, &attrs[..1]);
}

pub fn record_provider_request(provider: &str, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    handles().provider_requests.add(
        1,
        &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("status", status),
        ],
    );
}
