//! Optional OpenTelemetry export
//!
//! Spans are shipped over OTLP only when the daemon is built with the
//! `telemetry` feature and `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
//!
//! ```text
//! OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 \
//! OTEL_SERVICE_NAME=jsonify-dev \
//!     ./jsonifyd
//! ```

const ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
#[cfg(feature = "telemetry")]
const SERVICE_NAME_ENV: &str = "OTEL_SERVICE_NAME";
#[cfg(feature = "telemetry")]
const DEFAULT_SERVICE_NAME: &str = "jsonify-daemon";

/// Tracing layer exporting spans over OTLP, if an endpoint is configured
#[cfg(feature = "telemetry")]
pub fn layer<S>() -> anyhow::Result<
    Option<tracing_opentelemetry::OpenTelemetryLayer<S, opentelemetry_sdk::trace::Tracer>>,
>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::TracerProvider;
    use opentelemetry_sdk::Resource;

    let Ok(endpoint) = std::env::var(ENDPOINT_ENV) else {
        return Ok(None);
    };
    let service_name =
        std::env::var(SERVICE_NAME_ENV).unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.clone(),
        )]))
        .build();
    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(Some(tracing_opentelemetry::layer().with_tracer(tracer)))
}

/// Log whether span export is active; call once the subscriber is installed
pub fn report_status() {
    let endpoint = std::env::var(ENDPOINT_ENV).ok();

    #[cfg(feature = "telemetry")]
    match endpoint {
        Some(endpoint) => tracing::info!(endpoint = %endpoint, "OpenTelemetry export enabled"),
        None => tracing::debug!("OpenTelemetry not configured ({} not set)", ENDPOINT_ENV),
    }

    #[cfg(not(feature = "telemetry"))]
    if endpoint.is_some() {
        tracing::warn!("OpenTelemetry endpoint set but feature 'telemetry' not enabled");
        tracing::warn!("Rebuild with: cargo build --features telemetry");
    }
}

/// Flush pending spans
pub fn shutdown() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}
