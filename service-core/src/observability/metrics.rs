use anyhow::Context;
use axum::{extract::Request, middleware::Next, response::Response};
use prometheus::{Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;
use std::time::Instant;

static REGISTRY: OnceLock<Registry> = OnceLock::new();
static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

/// Register the HTTP request metrics. Call once at startup, before the
/// router starts serving; repeated calls are ignored.
pub fn init_metrics() {
    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )
    .expect("metric can be created");

    let request_duration = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ),
        &["method", "path", "status"],
    )
    .expect("metric can be created");

    registry
        .register(Box::new(requests_total.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(request_duration.clone()))
        .expect("collector can be registered");

    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(request_duration);
}

/// Record request count and latency, labelled by method/path/status.
/// A no-op until `init_metrics` has run.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    if let (Some(counter), Some(histogram)) = (
        HTTP_REQUESTS_TOTAL.get(),
        HTTP_REQUEST_DURATION_SECONDS.get(),
    ) {
        counter.with_label_values(&[&method, &path, &status]).inc();
        histogram
            .with_label_values(&[&method, &path, &status])
            .observe(start.elapsed().as_secs_f64());
    }

    response
}

/// Render the registry in Prometheus text exposition format.
pub fn render_metrics() -> anyhow::Result<String> {
    let registry = REGISTRY
        .get()
        .context("metrics registry not initialized")?;

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("failed to encode metrics")?;

    String::from_utf8(buffer).context("metrics output was not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_after_init_includes_registered_metrics() {
        init_metrics();
        // Second init must be a harmless no-op.
        init_metrics();

        HTTP_REQUESTS_TOTAL
            .get()
            .unwrap()
            .with_label_values(&["GET", "/health", "200"])
            .inc();

        let output = render_metrics().unwrap();
        assert!(output.contains("http_requests_total"));
        assert!(output.contains("http_request_duration_seconds"));
    }
}
