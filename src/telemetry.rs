use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{MetricExporter, SpanExporter};
use opentelemetry_sdk::{Resource, metrics::SdkMeterProvider, trace::SdkTracerProvider};
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer};
use tracing_subscriber::Layer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Export is switched on by the standard OTLP endpoint variable
const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn get_resource() -> Resource {
    static RESOURCE: OnceLock<Resource> = OnceLock::new();
    RESOURCE
        .get_or_init(|| Resource::builder().with_service_name("quill").build())
        .clone()
}

fn init_traces() -> Result<SdkTracerProvider, BoxError> {
    let exporter = SpanExporter::builder().with_http().build()?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(get_resource())
        .build())
}

fn init_metrics() -> Result<SdkMeterProvider, BoxError> {
    let exporter = MetricExporter::builder().with_http().build()?;

    Ok(SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(get_resource())
        .build())
}

fn console_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

// Initialize tracing-subscriber. OTLP export is only set up when an endpoint
// is configured; the returned guard flushes it on drop.
pub fn init_tracing_subscriber() -> OtelGuard {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(console_filter());

    if std::env::var_os(OTLP_ENDPOINT_VAR).is_none() {
        tracing_subscriber::registry().with(console_layer).init();
        return OtelGuard::default();
    }

    let providers = init_traces().and_then(|traces| Ok((traces, init_metrics()?)));
    let (tracer_provider, meter_provider) = match providers {
        Ok(providers) => providers,
        Err(err) => {
            tracing_subscriber::registry().with(console_layer).init();
            tracing::warn!(error = %err, "OTLP export disabled");
            return OtelGuard::default();
        }
    };

    let tracer = tracer_provider.tracer("quill");

    // Keep the exporter's own HTTP stack out of the exported telemetry
    let otel_filter = || EnvFilter::new("info,hyper=off,h2=off,opentelemetry=off,reqwest=off");

    tracing_subscriber::registry()
        .with(console_layer)
        .with(MetricsLayer::new(meter_provider.clone()).with_filter(otel_filter()))
        .with(OpenTelemetryLayer::new(tracer).with_filter(otel_filter()))
        .init();

    OtelGuard {
        tracer_provider: Some(tracer_provider),
        meter_provider: Some(meter_provider),
    }
}

#[derive(Default)]
pub struct OtelGuard {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Some(tracer_provider) = self.tracer_provider.take() {
            if let Err(err) = tracer_provider.shutdown() {
                eprintln!("{err:?}");
            }
        }
        if let Some(meter_provider) = self.meter_provider.take() {
            if let Err(err) = meter_provider.shutdown() {
                eprintln!("{err:?}");
            }
        }
    }
}
