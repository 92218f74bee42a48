use std::borrow::Cow;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer};

/// Guard that flushes the global tracer provider on drop. The
/// `tracing-opentelemetry` wiring is global within the process, so the
/// global shutdown is the right scope.
pub struct OtelGuard {
    _private: (),
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

struct ErrorCounterLayer;

impl<S> Layer<S> for ErrorCounterLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            metrics::counter!("tracing_error_events").increment(1);
        }
    }
}

/// Build a `tracing` dispatcher for the agent binaries:
/// - JSON logs to stdout
/// - EnvFilter that respects `RUST_LOG` and falls back to `default_level`
/// - `tracing_error_events` counter for ERROR events
/// - OTLP trace export when `OTEL_EXPORTER_OTLP_ENDPOINT` is set
pub fn build_dispatch(
    service_name: impl Into<Cow<'static, str>>,
    default_level: &str,
) -> (tracing::Dispatch, Option<OtelGuard>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .json();

    let error_counter_layer = ErrorCounterLayer;

    let service_name = service_name.into();

    // OTLP export only when the endpoint env var exists. Keeps local dev
    // quiet and tests deterministic.
    let otel_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

    if let Some(endpoint) = otel_endpoint {
        use opentelemetry_otlp::WithExportConfig;

        let Ok(exporter) = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()
        else {
            // If the exporter cannot be built, fall back to logs+metrics only.
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .with(error_counter_layer);
            return (tracing::Dispatch::new(subscriber), None);
        };

        let resource = Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]);

        // Requires a Tokio runtime; the agent binary is `#[tokio::main]`.
        let provider = opentelemetry_sdk::trace::TracerProvider::builder()
            .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
            .with_resource(resource)
            .build();

        let tracer = provider.tracer("badseed_agent");
        let _ = opentelemetry::global::set_tracer_provider(provider);

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(error_counter_layer)
            .with(otel_layer);

        (
            tracing::Dispatch::new(subscriber),
            Some(OtelGuard { _private: () }),
        )
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(error_counter_layer);

        (tracing::Dispatch::new(subscriber), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_dispatch_without_otlp_endpoint() {
        // No OTEL endpoint in the test environment: no guard expected.
        let (dispatch, guard) = build_dispatch("badseed-agent-test", "info");
        assert!(guard.is_none());
        // The dispatch is usable as a scoped default.
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!("dispatch smoke test");
        });
    }
}
